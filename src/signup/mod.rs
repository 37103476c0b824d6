//! Browser-side waitlist logic: normalize the email, skip addresses this
//! client already sent, post the rest to the subscribe endpoint, and count
//! down to launch.

mod countdown;
mod form;
mod seen_list;

pub use countdown::Countdown;
pub use form::{Endpoint, SignupError, SignupForm, DEFAULT_ENDPOINT};
pub use seen_list::{
    FileSeenStore, MemorySeenStore, SeenList, SeenStore, SeenStoreError, SEEN_LIST_CAPACITY,
    STORAGE_KEY,
};
