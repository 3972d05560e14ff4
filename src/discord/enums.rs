//! Canonical names for Discord's numeric enumerations and bit flags.
//!
//! Value tables map an enumeration value to its name and are read with
//! [`stringify`]. Flag tables map a name to its bit and are read with
//! [`list_stringify`]. All tables are built once per process.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Name reported for values and bits no table knows about.
pub const UNIMPLEMENTED: &str = "UNIMPLEMENTED";

/// Maps an enumeration value to its name.
pub type ValueTable = BTreeMap<i64, &'static str>;

/// Maps a flag name to its bit. Keys iterate in lexicographic order.
pub type FlagTable = BTreeMap<&'static str, u64>;

fn values(entries: &[(i64, &'static str)]) -> ValueTable {
    entries.iter().copied().collect()
}

fn flags(entries: &[(&'static str, u32)]) -> FlagTable {
    entries.iter().map(|&(name, bit)| (name, 1u64 << bit)).collect()
}

pub static MESSAGE_NOTIFICATIONS: LazyLock<ValueTable> =
    LazyLock::new(|| values(&[(0, "ALL_MESSAGES"), (1, "ONLY_MENTIONS")]));

pub static EXPLICIT_CONTENT_FILTERS: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[
        (0, "DISABLED"),
        (1, "MEMBERS_WITHOUT_ROLES"),
        (2, "ALL_MEMBERS"),
    ])
});

pub static MFA_LEVELS: LazyLock<ValueTable> =
    LazyLock::new(|| values(&[(0, "NONE"), (1, "ELEVATED")]));

pub static VERIFICATION_LEVELS: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[
        (0, "NONE"),
        (1, "LOW"),
        (2, "MEDIUM"),
        (3, "HIGH"),
        (4, "VERY_HIGH"),
    ])
});

pub static GUILD_NSFW_LEVELS: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[
        (0, "DEFAULT"),
        (1, "EXPLICIT"),
        (2, "SAFE"),
        (3, "AGE_RESTRICTED"),
    ])
});

pub static PREMIUM_TIERS: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[(0, "NONE"), (1, "TIER_1"), (2, "TIER_2"), (3, "TIER_3")])
});

pub static PREMIUM_TYPES: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[
        (0, "NONE"),
        (1, "NITRO_CLASSIC"),
        (2, "NITRO"),
        (3, "NITRO_BASIC"),
    ])
});

pub const CHANNEL_TYPE_GUILD_TEXT: i64 = 0;
pub const CHANNEL_TYPE_GUILD_CATEGORY: i64 = 4;
pub const CHANNEL_TYPE_ANNOUNCEMENT_THREAD: i64 = 10;
pub const CHANNEL_TYPE_PUBLIC_THREAD: i64 = 11;
pub const CHANNEL_TYPE_PRIVATE_THREAD: i64 = 12;

// "GUILD_ANNOUCEMENT" is misspelled in released state files and must stay that way.
pub static CHANNEL_TYPES: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[
        (CHANNEL_TYPE_GUILD_TEXT, "GUILD_TEXT"),
        (1, "DM"),
        (2, "GUILD_VOICE"),
        (3, "GROUP_DM"),
        (CHANNEL_TYPE_GUILD_CATEGORY, "GUILD_CATEGORY"),
        (5, "GUILD_ANNOUCEMENT"),
        (6, "GUILD_STORE"),
        (CHANNEL_TYPE_ANNOUNCEMENT_THREAD, "ANNOUNCEMENT_THREAD"),
        (CHANNEL_TYPE_PUBLIC_THREAD, "PUBLIC_THREAD"),
        (CHANNEL_TYPE_PRIVATE_THREAD, "PRIVATE_THREAD"),
        (13, "GUILD_STAGE_VOICE"),
        (14, "GUILD_DIRECTORY"),
        (15, "GUILD_FORUM"),
        (16, "GUILD_MEDIA"),
    ])
});

pub static FORUM_SORT_ORDERS: LazyLock<ValueTable> =
    LazyLock::new(|| values(&[(0, "LATEST_ACTIVITY"), (1, "CREATION_DATE")]));

pub static FORUM_LAYOUTS: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[(0, "NOT_SET"), (1, "LIST_VIEW"), (2, "GALLERY_VIEW")])
});

pub static OVERWRITE_TYPES: LazyLock<ValueTable> =
    LazyLock::new(|| values(&[(0, "ROLE"), (1, "MEMBER")]));

pub static WEBHOOK_TYPES: LazyLock<ValueTable> = LazyLock::new(|| {
    values(&[(1, "INCOMING"), (2, "CHANNEL_FOLLOWER"), (3, "APPLICATION")])
});

pub static SYSTEM_CHANNEL_FLAGS: LazyLock<FlagTable> = LazyLock::new(|| {
    flags(&[
        ("SUPPRESS_JOIN_NOTIFICATIONS", 0),
        ("SUPPRESS_PREMIUM_SUBSCRIPTIONS", 1),
        ("SUPPRESS_GUILD_REMINDER_NOTIFICATIONS", 2),
        ("SUPPRESS_JOIN_NOTIFICATION_REPLIES", 3),
        ("SUPPRESS_ROLE_SUBSCRIPTION_PURCHASE_NOTIFICATIONS", 4),
        ("SUPPRESS_ROLE_SUBSCRIPTION_PURCHASE_NOTIFICATION_REPLIES", 5),
    ])
});

pub static ROLE_FLAGS: LazyLock<FlagTable> = LazyLock::new(|| flags(&[("IN_PROMPT", 0)]));

pub static CHANNEL_FLAGS: LazyLock<FlagTable> = LazyLock::new(|| {
    flags(&[
        ("PINNED", 1),
        ("REQUIRE_TAG", 4),
        ("HIDE_MEDIA_DOWNLOAD_OPTIONS", 15),
    ])
});

pub static MEMBER_FLAGS: LazyLock<FlagTable> = LazyLock::new(|| {
    flags(&[
        ("DID_REJOIN", 0),
        ("COMPLETED_ONBOARDING", 1),
        ("BYPASSES_VERIFICATION", 2),
        ("STARTED_ONBOARDING", 3),
        ("IS_GUEST", 4),
        ("STARTED_HOME_ACTIONS", 5),
        ("COMPLETED_HOME_ACTIONS", 6),
        ("AUTOMOD_QUARANTINED_USERNAME", 7),
        ("DM_SETTINGS_UPSELL_ACKNOWLEDGED", 9),
    ])
});

pub static USER_FLAGS: LazyLock<FlagTable> = LazyLock::new(|| {
    flags(&[
        ("STAFF", 0),
        ("PARTNER", 1),
        ("HYPESQUAD", 2),
        ("BUG_HUNTER_LEVEL_1", 3),
        ("HYPESQUAD_ONLINE_HOUSE_1", 6),
        ("HYPESQUAD_ONLINE_HOUSE_2", 7),
        ("HYPESQUAD_ONLINE_HOUSE_3", 8),
        ("PREMIUM_EARLY_SUPPORTER", 9),
        ("TEAM_PSEUDO_USER", 10),
        ("BUG_HUNTER_LEVEL_2", 14),
        ("VERIFIED_BOT", 16),
        ("VERIFIED_DEVELOPER", 17),
        ("CERTIFIED_MODERATOR", 18),
        ("BOT_HTTP_INTERACTIONS", 19),
        ("ACTIVE_DEVELOPER", 22),
    ])
});

pub static PERMISSIONS: LazyLock<FlagTable> = LazyLock::new(|| {
    flags(&[
        ("CREATE_INSTANT_INVITE", 0),
        ("KICK_MEMBERS", 1),
        ("BAN_MEMBERS", 2),
        ("ADMINISTRATOR", 3),
        ("MANAGE_CHANNELS", 4),
        ("MANAGE_GUILD", 5),
        ("ADD_REACTIONS", 6),
        ("VIEW_AUDIT_LOG", 7),
        ("PRIORITY_SPEAKER", 8),
        ("STREAM", 9),
        ("VIEW_CHANNEL", 10),
        ("SEND_MESSAGES", 11),
        ("SEND_TTS_MESSAGES", 12),
        ("MANAGE_MESSAGES", 13),
        ("EMBED_LINKS", 14),
        ("ATTACH_FILES", 15),
        ("READ_MESSAGE_HISTORY", 16),
        ("MENTION_EVERYONE", 17),
        ("USE_EXTERNAL_EMOJIS", 18),
        ("VIEW_GUILD_INSIGHTS", 19),
        ("CONNECT", 20),
        ("SPEAK", 21),
        ("MUTE_MEMBERS", 22),
        ("DEAFEN_MEMBERS", 23),
        ("MOVE_MEMBERS", 24),
        ("USE_VAD", 25),
        ("CHANGE_NICKNAME", 26),
        ("MANAGE_NICKNAMES", 27),
        ("MANAGE_ROLES", 28),
        ("MANAGE_WEBHOOKS", 29),
        ("MANAGE_GUILD_EXPRESSIONS", 30),
        ("USE_APPLICATION_COMMANDS", 31),
        ("REQUEST_TO_SPEAK", 32),
        ("MANAGE_EVENTS", 33),
        ("MANAGE_THREADS", 34),
        ("CREATE_PUBLIC_THREADS", 35),
        ("CREATE_PRIVATE_THREADS", 36),
        ("USE_EXTERNAL_STICKERS", 37),
        ("SEND_MESSAGES_IN_THREADS", 38),
        ("USE_EMBEDDED_ACTIVITIES", 39),
        ("MODERATE_MEMBERS", 40),
        ("VIEW_CREATOR_MONETIZATION_ANALYTICS", 41),
        ("USE_SOUNDBOARD", 42),
        ("CREATE_GUILD_EXPRESSIONS", 43),
        ("CREATE_EVENTS", 44),
        ("USE_EXTERNAL_SOUNDS", 45),
        ("SEND_VOICE_MESSAGES", 46),
        ("SEND_POLLS", 49),
        ("USE_EXTERNAL_APPS", 50),
    ])
});

/// Returns the name of `value`, or [`UNIMPLEMENTED`] if the table lacks it.
pub fn stringify(value: i64, table: &ValueTable) -> String {
    table.get(&value).copied().unwrap_or(UNIMPLEMENTED).to_string()
}

/// Looks up the value whose name is `name`.
pub fn value_of(name: &str, table: &ValueTable) -> Option<i64> {
    table
        .iter()
        .find_map(|(value, candidate)| (*candidate == name).then_some(*value))
}

/// Returns the names of every flag set in `bits`, sorted and deduplicated.
///
/// Set bits that no name covers add a single [`UNIMPLEMENTED`] entry.
pub fn list_stringify(bits: u64, table: &FlagTable) -> Vec<String> {
    let mut names: Vec<String> = table
        .iter()
        .filter(|(_, bit)| bits & **bit == **bit)
        .map(|(name, _)| name.to_string())
        .collect();

    let covered = table.values().fold(0u64, |acc, bit| acc | bit);
    if bits & !covered != 0 {
        // Keep the list sorted; "UNIMPLEMENTED" is not a table key, so no duplicate.
        let at = names.partition_point(|n| n.as_str() < UNIMPLEMENTED);
        names.insert(at, UNIMPLEMENTED.to_string());
    }

    names
}

/// OR-reduces the bits of every name in `names`. Unknown names are ignored.
pub fn calc_flags<S: AsRef<str>>(names: &[S], table: &FlagTable) -> u64 {
    names
        .iter()
        .filter_map(|name| table.get(name.as_ref()))
        .fold(0, |acc, bit| acc | bit)
}

/// The permission bitfield for a list of permission names.
pub fn calc_permissions<S: AsRef<str>>(names: &[S]) -> u64 {
    calc_flags(names, &PERMISSIONS)
}
