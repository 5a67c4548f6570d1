pub mod device;
pub mod dispatch;
