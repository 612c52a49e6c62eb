use strata_core::errors::StrataError;
use strata_core::{Position, Record};

/// Converts positions into the equal-area sampling frame and back.
pub trait Reprojector {
    /// Maps an input-frame position into the sampling frame.
    fn forward(&self, position: Position) -> Result<Position, StrataError>;

    /// Maps a sampling-frame position back into the output frame.
    fn inverse(&self, position: Position) -> Result<Position, StrataError>;

    /// Reprojects every record into the sampling frame.
    fn forward_all(&self, records: Vec<Record>) -> Result<Vec<Record>, StrataError> {
        records
            .into_iter()
            .map(|mut record| {
                record.position = self.forward(record.position)?;
                Ok(record)
            })
            .collect()
    }
}

/// Leaves coordinates untouched; the inputs already share one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Reprojector for Identity {
    fn forward(&self, position: Position) -> Result<Position, StrataError> {
        Ok(position)
    }

    fn inverse(&self, position: Position) -> Result<Position, StrataError> {
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shift(f64);

    impl Reprojector for Shift {
        fn forward(&self, position: Position) -> Result<Position, StrataError> {
            Ok(Position::new(position.x + self.0, position.y))
        }

        fn inverse(&self, position: Position) -> Result<Position, StrataError> {
            Ok(Position::new(position.x - self.0, position.y))
        }
    }

    #[test]
    fn forward_all_moves_every_record() {
        let records = vec![
            Record::new("a", Position::new(1.0, 2.0)),
            Record::new("b", Position::new(3.0, 4.0)),
        ];
        let moved = Shift(10.0).forward_all(records.clone()).unwrap();
        assert_eq!(moved[0].position, Position::new(11.0, 2.0));
        assert_eq!(moved[1].position, Position::new(13.0, 4.0));
        assert_eq!(Identity.forward_all(records.clone()).unwrap(), records);
        assert_eq!(
            Shift(10.0).inverse(moved[0].position).unwrap(),
            Position::new(1.0, 2.0)
        );
    }
}
