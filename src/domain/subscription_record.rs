use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::new_subscriber::NewSubscriber;
use crate::domain::subscriber_email::SubscriberEmail;

/// One row of the waitlist sheet.
#[derive(Debug)]
pub struct SubscriptionRecord {
    pub subscribed_at: DateTime<Utc>,
    pub email: SubscriberEmail,
    pub source: String,
    pub user_agent: String,
}

impl SubscriptionRecord {
    pub fn new(
        new_subscriber: NewSubscriber,
        user_agent: Option<String>,
        subscribed_at: DateTime<Utc>,
    ) -> SubscriptionRecord {
        SubscriptionRecord {
            subscribed_at,
            email: new_subscriber.email,
            source: new_subscriber.source,
            user_agent: user_agent.unwrap_or_default(),
        }
    }

    /// Sheet columns A to D: timestamp, email, source, user agent.
    pub fn to_row(&self) -> [String; 4] {
        [
            self.subscribed_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            String::from(self.email.as_ref()),
            self.source.clone(),
            self.user_agent.clone(),
        ]
    }
}
