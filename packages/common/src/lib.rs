pub mod retry;
pub mod storage;
pub mod transport;

pub use retry::{RetryMode, RetryOptions};
pub use transport::fault::{FaultInjectionTransport, ServiceFault, ThrottlePolicy, ThrottleWindows};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
