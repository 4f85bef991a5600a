/// Application name
pub const APP_NAME: &str = "Mealtrace";

/// Energy per gram of protein (Atwater factor)
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;

/// Energy per gram of carbohydrate (Atwater factor)
pub const KCAL_PER_G_CARBS: f64 = 4.0;

/// Energy per gram of fat (Atwater factor)
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Pending pushes are dropped from the queue after this many failures
pub const MAX_PUSH_ATTEMPTS: u32 = 5;

/// Pull-merge correlation window between a local record's creation time
/// and a remote record's eaten-at timestamp, in seconds
pub const MERGE_WINDOW_SECS: i64 = 60;

/// Image eviction ladder: strip images older than N days, oldest step first.
/// The final step (0) purges images from today's records as well.
pub const EVICTION_AGE_STEPS_DAYS: [i64; 4] = [7, 3, 1, 0];

/// Prefix for anonymous device identifiers (`user_<millis>_<random>`)
pub const DEVICE_ID_PREFIX: &str = "user";
