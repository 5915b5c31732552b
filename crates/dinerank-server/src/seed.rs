use dinerank_core::{RestaurantInput, Result};
use dinerank_engine::RankingEngine;

/// Sample restaurants loaded when `bootstrap.seed_sample_data` is set.
pub fn sample_restaurants() -> Vec<RestaurantInput> {
    vec![
        RestaurantInput::new(
            "The Golden Spoon",
            "123 Main St, Downtown, City 12345",
            "+1-555-0101",
        )
        .with_score(4.8)
        .with_cuisine("Italian")
        .with_description("Authentic Italian cuisine with a modern twist"),
        RestaurantInput::new("Sushi Sensation", "456 Oak Ave, Uptown, City 12345", "+1-555-0102")
            .with_score(4.9)
            .with_cuisine("Japanese")
            .with_description("Fresh sushi and traditional Japanese dishes"),
        RestaurantInput::new("Burger Barn", "789 Pine St, Westside, City 12345", "+1-555-0103")
            .with_score(4.6)
            .with_cuisine("American")
            .with_description("Gourmet burgers and craft beer"),
        RestaurantInput::new("Cafe Cozy", "12 Elm St, Old Town, City 12345", "+1-555-0104")
            .with_score(4.8)
            .with_cuisine("Cafe")
            .with_description("Coffee, pastries and a quiet corner to read"),
        RestaurantInput::new("Pizza Palace", "123 Main St, Downtown", "+1-555-0123")
            .with_score(4.5)
            .with_cuisine("Italian")
            .with_description("Wood-fired pizza by the slice"),
        RestaurantInput::new("Grill & Chill", "55 Harbor Rd, Eastside, City 12345", "+1-555-0105")
            .with_cuisine("Barbecue")
            .with_description("Smoked meats, not yet reviewed"),
    ]
}

/// Load the sample restaurants. Returns how many were created.
pub fn seed_sample_data(engine: &RankingEngine) -> Result<usize> {
    let samples = sample_restaurants();
    let count = samples.len();
    for input in samples {
        engine.create_or_update(input)?;
    }
    tracing::info!(count, "sample restaurants loaded");
    Ok(count)
}
