//! Per-user ratings and the average derived from them

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Material, Rating};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A validated rating value in `MIN_RATING..=MAX_RATING`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingValue(u8);

impl RatingValue {
    pub fn new(value: f64) -> AppResult<Self> {
        if value.fract() != 0.0 || value < f64::from(MIN_RATING) || value > f64::from(MAX_RATING) {
            return Err(AppError::Validation(format!(
                "Rating must be an integer between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// What a submission did to the ratings collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingChange {
    Added,
    Updated { previous: u8 },
}

/// Overwrite `user`'s rating if present, otherwise append it.
pub fn upsert_rating(ratings: &mut Vec<Rating>, user: Uuid, value: RatingValue) -> RatingChange {
    match ratings.iter_mut().find(|r| r.user == user) {
        Some(existing) => {
            let previous = existing.value;
            existing.value = value.get();
            RatingChange::Updated { previous }
        }
        None => {
            ratings.push(Rating {
                user,
                value: value.get(),
            });
            RatingChange::Added
        }
    }
}

/// Arithmetic mean of the rating values; 0 for no ratings
pub fn average_of(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let total: u64 = ratings.iter().map(|r| u64::from(r.value)).sum();
    total as f64 / ratings.len() as f64
}

impl Material {
    /// Record `user`'s rating and recompute the average.
    pub fn apply_rating(&mut self, user: Uuid, value: RatingValue) -> RatingChange {
        let change = upsert_rating(&mut self.ratings, user, value);
        self.average_rating = average_of(&self.ratings);
        change
    }
}
