pub mod audit;
pub mod leave_request;
pub mod notification;
pub mod role;
