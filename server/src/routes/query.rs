use serde::Deserialize;

use crate::db::Visibility;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    #[serde(default)]
    pub days: Option<u16>,
}

/// The body of a featured-flag update.
#[derive(Debug, Deserialize)]
pub struct FeaturedRequest {
    pub is_featured: bool,
}
