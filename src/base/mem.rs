/// Completion callback handed to a memory model; receives the address of the retired transaction.
pub type Callback = Box<dyn FnMut(u64)>;

/// Trait for the memory-timing models that traffic drivers feed.
///
/// A driver calls `clock_tick` exactly once per cycle before making any admission attempt, and only
/// calls `add_transaction` right after `will_accept` answered true for the same arguments in the
/// same cycle.
pub trait MemorySystem {
    fn clock_tick(&mut self);

    /// Pure admission query; may be called any number of times per cycle.
    fn will_accept(&self, addr: u64, is_write: bool) -> bool;

    fn add_transaction(&mut self, addr: u64, is_write: bool);

    fn print_stats(&mut self);

    /// Offer a transaction, admitting it if the model will take it this cycle.
    fn try_add(&mut self, addr: u64, is_write: bool) -> bool {
        if !self.will_accept(addr, is_write) {
            return false;
        }
        self.add_transaction(addr, is_write);
        true
    }
}
