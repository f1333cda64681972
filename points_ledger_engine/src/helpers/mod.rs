mod fifo;

pub use fifo::{replay_remainders, stale_earns, EarnRemainder};
