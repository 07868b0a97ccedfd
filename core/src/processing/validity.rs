use crate::formats::ValidityRule;
use crate::model::PointSet;
use crate::prelude::{PipelineError, PipelineResult, PointStage};

/// Drops records whose primary attribute is a "no retrieval" sentinel.
///
/// Runs before deduplication so a sentinel record can never shadow a valid
/// one at the same coordinate.
pub struct ValidityFilter {
    rule: ValidityRule,
}

impl ValidityFilter {
    pub fn new(rule: ValidityRule) -> Self {
        Self { rule }
    }
}

impl PointStage for ValidityFilter {
    fn name(&self) -> &'static str {
        "validity"
    }

    fn execute(&self, input: PointSet) -> PipelineResult<PointSet> {
        let field = input.field_index(&self.rule.field).ok_or_else(|| {
            PipelineError::Config(format!(
                "source `{}` has no field `{}` to validate",
                input.source_id, self.rule.field
            ))
        })?;

        let validity = self.rule.validity;
        let records = input
            .records
            .iter()
            .filter(|record| validity.accepts(record.values[field]))
            .cloned()
            .collect();
        Ok(input.derive(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::Validity;
    use crate::model::PointRecord;

    #[test]
    fn sentinels_and_negative_values_are_dropped() {
        let mut set = PointSet::new("smap", vec!["soil_moisture".into()]);
        set.records = vec![
            PointRecord::new(1.0, 1.0, vec![-9999.0]),
            PointRecord::new(1.0, 2.0, vec![0.0]),
            PointRecord::new(1.0, 3.0, vec![f64::NAN]),
            PointRecord::new(1.0, 4.0, vec![0.3]),
        ];
        let filter = ValidityFilter::new(ValidityRule {
            field: "soil_moisture".into(),
            validity: Validity::NonNegative,
        });

        let output = filter.execute(set).unwrap();
        let lons: Vec<f64> = output.records.iter().map(|r| r.longitude).collect();
        assert_eq!(lons, vec![2.0, 4.0]);
    }

    #[test]
    fn unknown_field_is_a_configuration_error() {
        let set = PointSet::new("cygnss", vec!["ddm_snr".into()]);
        let filter = ValidityFilter::new(ValidityRule {
            field: "soil_moisture".into(),
            validity: Validity::Finite,
        });
        assert!(matches!(filter.execute(set), Err(PipelineError::Config(_))));
    }
}
