use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    pub static ref TOKENS_ISSUED_COUNTER: CounterVec = register_counter_vec!(
        "shop_tokens_issued_total",
        "Signed tokens issued by kind",
        &["kind"]
    ).unwrap();

    pub static ref TOKEN_REJECTIONS_COUNTER: CounterVec = register_counter_vec!(
        "shop_token_rejections_total",
        "Token verification failures by kind and reason",
        &["kind", "reason"]
    ).unwrap();

    pub static ref SIGNINS_COUNTER: CounterVec = register_counter_vec!(
        "shop_signins_total",
        "Sign-in attempts by status",
        &["status"]
    ).unwrap();
}
