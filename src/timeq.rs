/*
Time-queue used by the bundled memory model.

A memory channel is wrapped by a TimedServer, which enforces a service law:
    - a base latency plus a throughput component expressed in bytes-per-cycle
    - a bounded number of outstanding transactions

A server that cannot take more work answers with a Backpressure and hands the request back, so
the caller can retry it unchanged on a later cycle. Accepted requests yield a `Ticket` describing
when the transaction completes; `service_ready` retires tickets in FIFO order.
*/

use std::collections::VecDeque;

pub type Cycle = u64;

// Result of queueing a request with a timed server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    issued_at: Cycle,
    ready_at: Cycle,
}

impl Ticket {
    fn new(issued_at: Cycle, ready_at: Cycle) -> Self {
        Self {
            issued_at,
            ready_at,
        }
    }

    pub fn issued_at(&self) -> Cycle {
        self.issued_at
    }

    pub fn ready_at(&self) -> Cycle {
        self.ready_at
    }

    pub fn is_ready(&self, now: Cycle) -> bool {
        now >= self.ready_at
    }

    pub fn latency(&self) -> Cycle {
        self.ready_at.saturating_sub(self.issued_at)
    }
}

#[derive(Debug)]
pub struct ServiceRequest<T> {
    pub payload: T,
    pub size_bytes: u32,
}

impl<T> ServiceRequest<T> {
    pub fn new(payload: T, size_bytes: u32) -> Self {
        Self { payload, size_bytes }
    }
}

#[derive(Debug)]
pub struct ServiceResult<T> {
    pub payload: T,
    pub ticket: Ticket,
}

// Reasons why the server rejected a request
#[derive(Debug)]
pub enum Backpressure<T> {
    QueueFull { request: ServiceRequest<T>, capacity: usize },
    Busy { request: ServiceRequest<T>, available_at: Cycle },
}

impl<T> Backpressure<T> {
    pub fn into_request(self) -> ServiceRequest<T> {
        match self {
            Backpressure::QueueFull { request, .. } => request,
            Backpressure::Busy { request, .. } => request,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    // Fixed latency added to every request
    pub base_latency: Cycle,
    pub bytes_per_cycle: u32,
    // Maximum number of outstanding requests the server will accept
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_latency: 0,
            bytes_per_cycle: 1,
            queue_capacity: 1,
        }
    }
}

#[derive(Debug)]
struct Inflight<T> {
    payload: T,
    ticket: Ticket,
}

#[derive(Debug)]
pub struct TimedServer<T> {
    config: ServerConfig,
    inflight: VecDeque<Inflight<T>>,
    busy_until: Cycle,
}

impl<T> TimedServer<T> {
    pub fn new(config: ServerConfig) -> Self {
        assert!(config.bytes_per_cycle > 0, "bytes_per_cycle must be > 0");
        assert!(config.queue_capacity > 0, "queue_capacity must be > 0");
        Self {
            config,
            inflight: VecDeque::with_capacity(config.queue_capacity),
            busy_until: 0,
        }
    }

    /// Whether `try_enqueue` at `now` would succeed. Has no side effects.
    pub fn can_enqueue(&self, now: Cycle) -> bool {
        if self.inflight.len() >= self.config.queue_capacity {
            return false;
        }
        !(self.busy_until > now && self.inflight.is_empty())
    }

    pub fn try_enqueue(
        &mut self,
        now: Cycle,
        request: ServiceRequest<T>,
    ) -> Result<Ticket, Backpressure<T>> {
        if self.inflight.len() >= self.config.queue_capacity {
            return Err(Backpressure::QueueFull {
                request,
                capacity: self.config.queue_capacity,
            });
        }

        let available_at = self.busy_until.max(now);
        if available_at > now && self.inflight.is_empty() {
            return Err(Backpressure::Busy {
                request,
                available_at,
            });
        }

        let ready_at = self.next_ready_cycle(available_at, request.size_bytes);
        let ticket = Ticket::new(now, ready_at);

        self.busy_until = ready_at;
        self.inflight.push_back(Inflight {
            payload: request.payload,
            ticket,
        });

        Ok(ticket)
    }

    // Retire every request that has completed by `now`, oldest first.
    pub fn service_ready<F>(&mut self, now: Cycle, mut callback: F)
    where
        F: FnMut(ServiceResult<T>),
    {
        while self
            .inflight
            .front()
            .is_some_and(|front| front.ticket.is_ready(now))
        {
            let Some(inflight) = self.inflight.pop_front() else {
                break;
            };
            callback(ServiceResult {
                payload: inflight.payload,
                ticket: inflight.ticket,
            });
        }

        if self.inflight.is_empty() && now > self.busy_until {
            self.busy_until = now;
        }
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    pub fn available_at(&self) -> Cycle {
        self.busy_until
    }

    fn next_ready_cycle(&self, start: Cycle, size_bytes: u32) -> Cycle {
        let service_cycles = (size_bytes as u64).div_ceil(self.config.bytes_per_cycle as u64);
        start
            .saturating_add(self.config.base_latency)
            .saturating_add(service_cycles)
    }
}
