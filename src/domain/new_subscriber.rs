use serde_json::Value;

use crate::domain::subscriber_email::SubscriberEmail;

pub const DEFAULT_SOURCE: &str = "coming-soon";

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub source: String,
}

/// Raw subscribe payload. Fields stay untyped so a wrongly typed `email`
/// becomes a validation error instead of a deserialization failure.
#[derive(Default, Debug)]
pub struct NewSubscriberBody {
    pub email: Option<Value>,
    pub source: Option<Value>,
}

impl NewSubscriberBody {
    /// Reads the body as JSON whatever the declared content type. Anything
    /// that is not a JSON object yields an empty body.
    pub fn from_bytes(bytes: &[u8]) -> NewSubscriberBody {
        // Only an object carries fields, arrays must not fill them by position
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(mut fields)) => NewSubscriberBody {
                email: fields.remove("email"),
                source: fields.remove("source"),
            },
            _ => NewSubscriberBody::default(),
        }
    }
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = String;

    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        let email = match body.email {
            Some(Value::String(email)) => SubscriberEmail::parse(email)?,
            Some(other) => return Err(format!("email must be a string, got {}", other)),
            None => return Err(String::from("email is missing")),
        };
        let source = match body.source {
            Some(Value::String(source)) if !source.is_empty() => source,
            _ => String::from(DEFAULT_SOURCE),
        };

        Ok(NewSubscriber { email, source })
    }
}
