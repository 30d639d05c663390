//! Database models for the Atelier platform.

pub mod order;
pub mod post;
pub mod work;
pub mod work_version;

pub use order::{mask_email, NewOrder, Order, OrderStatus};
pub use post::{NewPost, Post};
pub use work::{NewWork, PublishStatus, Work, WorkType};
pub use work_version::{NewWorkVersion, WorkVersion};
