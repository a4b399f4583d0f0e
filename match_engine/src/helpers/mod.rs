mod scoring;

pub use scoring::{
    age_proximity,
    compatibility_score,
    haversine_km,
    interest_overlap,
    is_compatible,
    location_score,
    rank_candidates,
    AGE_WEIGHT,
    INTEREST_WEIGHT,
    LOCATION_WEIGHT,
};
