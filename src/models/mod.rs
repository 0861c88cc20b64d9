// Database rows and request/response shapes

pub mod attendance;
pub mod branch;
pub mod coach;
pub mod dashboard;
pub mod package;
pub mod payment;
pub mod student;
pub mod training_session;
pub mod user;
pub mod validation;

pub use attendance::*;
pub use branch::*;
pub use coach::*;
pub use dashboard::*;
pub use package::*;
pub use payment::*;
pub use student::*;
pub use training_session::*;
pub use user::*;
pub use validation::*;
