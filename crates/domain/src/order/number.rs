use chrono::Utc;
use uuid::Uuid;

/// Generates a human-readable order number: `ORD-<unix millis>-<4 random digits>`.
///
/// Not guaranteed unique on its own; the store's unique constraint on
/// `order_number` catches collisions and checkout retries with a fresh number.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().as_u128() % 10_000;
    format!("ORD-{millis}-{random:04}")
}
