pub const VISITOR_PROFILE_COOKIE_NAME: &str = "visitor_profile";
pub const OAUTH_STATE: &str = "weshop";
pub const OAUTH_SCOPE: &str = "snsapi_userinfo";

pub const WECHAT_ENDPOINT_AUTHORIZE: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";
pub const WECHAT_ENDPOINT_ACCESS_TOKEN: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";
pub const WECHAT_ENDPOINT_USER_INFO: &str = "https://api.weixin.qq.com/sns/userinfo";

/// Answer for message types the router does not handle
pub const FALLBACK_REPLY: &str = "对不起，懵逼了，我该说啥？？？";

pub const MAX_AGE_COOKIES: i64 = chrono::TimeDelta::hours(4).num_seconds();
