//! Outputs built from selection results and observation tables: the winners
//! JSON, hub model cards with their training artifacts, and charts (SVG plus PDF).

pub mod artifacts;
pub mod charts;
pub mod model_card;
pub mod winners;

pub use artifacts::copy_training_artifacts;
pub use model_card::{
    build_model_card, generate_model_cards, profile, write_model_card, CardOptions,
    EnvironmentProfile, GeneratedCard, ModelCard, PROFILES,
};
pub use winners::{read_winners_json, write_winners_json};
