use serde::Serialize;

/// Average assigned to a tour that has no reviews.
pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

/// Raw aggregate over a tour's reviews as returned by the store.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct RatingStats {
    pub count: i64,
    pub average: Option<f64>,
}

/// Denormalised rating values stored on a tour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingAggregate {
    pub quantity: i32,
    pub average: f64,
}

impl RatingAggregate {
    pub fn empty() -> Self {
        Self {
            quantity: 0,
            average: DEFAULT_RATINGS_AVERAGE,
        }
    }

    pub fn from_stats(stats: RatingStats) -> Self {
        match stats.average {
            Some(average) if stats.count > 0 => Self {
                quantity: i32::try_from(stats.count).unwrap_or(i32::MAX),
                average: round_to_tenth(average),
            },
            _ => Self::empty(),
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_reviews_resets_to_default() {
        let aggregate = RatingAggregate::from_stats(RatingStats {
            count: 0,
            average: None,
        });

        assert_eq!(aggregate, RatingAggregate::empty());
        assert_eq!(aggregate.average, 4.5);
        assert_eq!(aggregate.quantity, 0);
    }

    #[test]
    fn test_average_rounded_to_one_decimal() {
        let aggregate = RatingAggregate::from_stats(RatingStats {
            count: 3,
            average: Some(4.666_666),
        });

        assert_eq!(aggregate.quantity, 3);
        assert_eq!(aggregate.average, 4.7);
    }
}
