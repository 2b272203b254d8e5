//! Reputation thresholds
//!
//! Points awarded per upload and the bar a single material must clear to
//! promote its uploader to Expert.

use serde::{Deserialize, Serialize};

use crate::models::Material;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationThresholds {
    /// Contribution points awarded per published material
    pub upload_points: u64,

    /// Minimum number of ratings on one material for Expert promotion
    pub expert_min_ratings: usize,

    /// Minimum average rating on that material for Expert promotion
    pub expert_min_average: f64,
}

impl Default for ReputationThresholds {
    fn default() -> Self {
        Self {
            upload_points: 10,
            expert_min_ratings: 5,
            expert_min_average: 4.0,
        }
    }
}

impl ReputationThresholds {
    pub fn qualifies_for_expert(&self, material: &Material) -> bool {
        material.ratings.len() >= self.expert_min_ratings
            && material.average_rating >= self.expert_min_average
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewMaterial, Rating};
    use crate::reputation::average_of;
    use uuid::Uuid;

    fn rated(values: &[u8]) -> Material {
        let mut material = NewMaterial {
            title: "t".into(),
            description: "d".into(),
            file_url: "/uploads/f".into(),
            subject: "s".into(),
            education_level: "e".into(),
        }
        .into_material(Uuid::new_v4());

        material.ratings = values
            .iter()
            .map(|&value| Rating {
                user: Uuid::new_v4(),
                value,
            })
            .collect();
        material.average_rating = average_of(&material.ratings);
        material
    }

    #[test]
    fn test_expert_requires_five_ratings() {
        let thresholds = ReputationThresholds::default();
        assert!(!thresholds.qualifies_for_expert(&rated(&[5, 5, 5, 5])));
        assert!(thresholds.qualifies_for_expert(&rated(&[5, 5, 5, 5, 5])));
    }

    #[test]
    fn test_expert_requires_average_of_four() {
        let thresholds = ReputationThresholds::default();
        assert!(thresholds.qualifies_for_expert(&rated(&[4, 4, 4, 4, 4])));
        assert!(!thresholds.qualifies_for_expert(&rated(&[4, 4, 4, 4, 3])));
        assert!(thresholds.qualifies_for_expert(&rated(&[5, 5, 4, 3, 3])));
    }
}
