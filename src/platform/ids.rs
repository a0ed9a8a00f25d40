use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::ToSchema;

/// Platform snowflakes travel as strings on the wire so 64-bit values survive JSON clients.
macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[serde_as]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[schema(value_type = String)]
        pub struct $name(#[serde_as(as = "DisplayFromStr")] pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse().map(Self)
            }
        }
    };
}

snowflake_id!(
    /// Identity of a platform user.
    UserId
);
snowflake_id!(
    /// Identity of a text or voice channel.
    ChannelId
);
snowflake_id!(
    /// Identity of a channel-group (server).
    GuildId
);

impl UserId {
    /// Key used for this user in the persisted score file.
    pub fn ledger_key(&self) -> String {
        self.0.to_string()
    }

    /// Chat mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_strings() {
        let json = serde_json::to_string(&UserId(1234567890123456789)).unwrap();
        assert_eq!(json, "\"1234567890123456789\"");

        let parsed: GuildId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(parsed, GuildId(42));
    }

    #[test]
    fn channel_ids_parse_from_command_arguments() {
        assert_eq!(" 77 ".parse::<ChannelId>().unwrap(), ChannelId(77));
        assert!("general".parse::<ChannelId>().is_err());
    }
}
