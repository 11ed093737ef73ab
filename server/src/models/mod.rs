pub mod concert;
pub mod friendship;
pub mod notification;
pub mod user;
pub mod user_concert;

pub use concert::{Concert, ConcertDraft};
pub use friendship::{Friendship, FriendshipStatus};
pub use notification::Notification;
pub use user::{NewProfile, User};
pub use user_concert::{ConcertStatus, UserConcert};
