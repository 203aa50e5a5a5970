mod fetch;
mod gather;
mod info;
mod register;
mod sync;

pub use fetch::cmd_fetch;
pub use gather::cmd_gather;
pub use info::cmd_info;
pub use register::cmd_register;
pub use sync::cmd_sync;
