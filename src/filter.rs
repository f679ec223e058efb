//! Rotation filtering over the last processed roster.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::models::Rotation;

/// Raw filter inputs as posted by the rotations pane.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct FilterForm {
    #[serde(default)]
    pub rotation: String,
    #[serde(default)]
    pub date_from: String,
    #[serde(default)]
    pub date_to: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub min_amount: String,
}

/// Criteria a rotation must satisfy, all of them at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationFilter {
    /// Uppercased substring of the rotation id.
    pub id: Option<String>,
    /// ISO `YYYY-MM-DD` lower bound.
    pub date_from: Option<String>,
    /// ISO `YYYY-MM-DD` upper bound.
    pub date_to: Option<String>,
    /// Uppercased substring of the outbound or inbound base.
    pub base: Option<String>,
    pub min_amount: f64,
}

fn non_empty_upper(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_uppercase())
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl From<&FilterForm> for RotationFilter {
    fn from(form: &FilterForm) -> Self {
        Self {
            id: non_empty_upper(&form.rotation),
            date_from: non_empty(&form.date_from),
            date_to: non_empty(&form.date_to),
            base: non_empty_upper(&form.base),
            // An unreadable amount filters nothing out.
            min_amount: form
                .min_amount
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
        }
    }
}

/// Converts a flight date `DD-MM-YYYY` into `YYYY-MM-DD` so that plain string
/// comparison orders dates. Anything else is returned unchanged.
pub fn to_iso_date(date: &str) -> Cow<'_, str> {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() == 3 {
        Cow::Owned(format!("{}-{}-{}", parts[2], parts[1], parts[0]))
    } else {
        Cow::Borrowed(date)
    }
}

impl RotationFilter {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.base.is_none()
            && self.min_amount <= 0.0
    }

    /// Back to form values, for re-rendering the inputs.
    pub fn to_form(&self) -> FilterForm {
        FilterForm {
            rotation: self.id.clone().unwrap_or_default(),
            date_from: self.date_from.clone().unwrap_or_default(),
            date_to: self.date_to.clone().unwrap_or_default(),
            base: self.base.clone().unwrap_or_default(),
            min_amount: if self.min_amount > 0.0 {
                self.min_amount.to_string()
            } else {
                String::new()
            },
        }
    }

    pub fn matches(&self, rotation: &Rotation) -> bool {
        if let Some(ref id) = self.id {
            if !rotation.id.to_uppercase().contains(id.as_str()) {
                return false;
            }
        }

        if rotation.total < self.min_amount {
            return false;
        }

        if let Some(ref base) = self.base {
            let outbound = rotation
                .first_departure()
                .is_some_and(|a| a.to_uppercase().contains(base.as_str()));
            let inbound = rotation
                .last_arrival()
                .is_some_and(|a| a.to_uppercase().contains(base.as_str()));
            if !outbound && !inbound {
                return false;
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let dates: Vec<Cow<'_, str>> =
                rotation.vols.iter().map(|v| to_iso_date(&v.date)).collect();

            if let Some(ref from) = self.date_from {
                if !dates.iter().any(|d| d.as_ref() >= from.as_str()) {
                    return false;
                }
            }

            if let Some(ref to) = self.date_to {
                if !dates.iter().any(|d| d.as_ref() <= to.as_str()) {
                    return false;
                }
            }
        }

        true
    }

    /// Keeps the rotations matching every criterion, in input order.
    pub fn apply<'a>(&self, rotations: &'a [Rotation]) -> Vec<&'a Rotation> {
        rotations.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flight;

    fn flight(date: &str, adep: &str, ades: &str) -> Flight {
        Flight {
            date: date.into(),
            adep: adep.into(),
            ades: ades.into(),
            ..Flight::default()
        }
    }

    fn rotation(id: &str, total: f64, vols: Vec<Flight>) -> Rotation {
        Rotation {
            id: id.into(),
            total,
            vols,
        }
    }

    fn roster() -> Vec<Rotation> {
        vec![
            rotation(
                "ROT-001",
                180.0,
                vec![
                    flight("05-03-2024", "LFLY", "LEMD"),
                    flight("06-03-2024", "LEMD", "LFLY"),
                ],
            ),
            rotation(
                "ROT-002",
                90.0,
                vec![
                    flight("12-03-2024", "LSGG", "LFPG"),
                    flight("12-03-2024", "LFPG", "EGLL"),
                    flight("13-03-2024", "EGLL", "LSGG"),
                ],
            ),
            rotation(
                "ROT-003",
                0.0,
                vec![flight("28-02-2024", "LFLB", "LFLS")],
            ),
        ]
    }

    mod defaults {
        use super::*;

        #[test]
        fn test_empty_filter_keeps_everything_in_order() {
            let roster = roster();
            let filter = RotationFilter::from(&FilterForm {
                min_amount: "0".into(),
                ..FilterForm::default()
            });
            assert!(filter.is_empty());
            let ids: Vec<&str> = filter.apply(&roster).iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["ROT-001", "ROT-002", "ROT-003"]);
        }

        #[test]
        fn test_unparsable_amount_counts_as_zero() {
            let filter = RotationFilter::from(&FilterForm {
                min_amount: "abc".into(),
                ..FilterForm::default()
            });
            assert_eq!(filter.min_amount, 0.0);
        }
    }

    mod criteria {
        use super::*;

        #[test]
        fn test_id_is_case_insensitive() {
            let roster = roster();
            let filter = RotationFilter::from(&FilterForm {
                rotation: "rot-002".into(),
                ..FilterForm::default()
            });
            let found = filter.apply(&roster);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, "ROT-002");
        }

        #[test]
        fn test_min_amount_is_inclusive() {
            let roster = roster();
            let filter = RotationFilter::from(&FilterForm {
                min_amount: "90".into(),
                ..FilterForm::default()
            });
            let ids: Vec<&str> = filter.apply(&roster).iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["ROT-001", "ROT-002"]);
        }

        #[test]
        fn test_base_ignores_interior_flights() {
            let roster = roster();
            // LFPG only appears between the first and the last flight of ROT-002.
            let filter = RotationFilter::from(&FilterForm {
                base: "lfpg".into(),
                ..FilterForm::default()
            });
            assert!(filter.apply(&roster).is_empty());
        }

        #[test]
        fn test_base_matches_either_endpoint() {
            let roster = roster();
            let filter = RotationFilter::from(&FilterForm {
                base: "LFLS".into(),
                ..FilterForm::default()
            });
            let found = filter.apply(&roster);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, "ROT-003");
        }

        #[test]
        fn test_base_never_matches_rotation_without_flights() {
            let empty = vec![rotation("ROT-404", 10.0, vec![])];
            let filter = RotationFilter::from(&FilterForm {
                base: "LF".into(),
                ..FilterForm::default()
            });
            assert!(filter.apply(&empty).is_empty());
        }
    }

    mod dates {
        use super::*;

        #[test]
        fn test_iso_conversion() {
            assert_eq!(to_iso_date("10-03-2024"), "2024-03-10");
            assert_eq!(to_iso_date("2024/03/10"), "2024/03/10");
        }

        #[test]
        fn test_date_from_includes_same_day() {
            let roster = vec![rotation(
                "ROT-010",
                50.0,
                vec![flight("09-03-2024", "LFLY", "LIRF"), flight("10-03-2024", "LIRF", "LFLY")],
            )];
            let filter = RotationFilter::from(&FilterForm {
                date_from: "2024-03-10".into(),
                ..FilterForm::default()
            });
            assert_eq!(filter.apply(&roster).len(), 1);
        }

        #[test]
        fn test_any_flight_in_range_is_enough() {
            let roster = roster();
            let filter = RotationFilter::from(&FilterForm {
                date_from: "2024-03-06".into(),
                date_to: "2024-03-12".into(),
                ..FilterForm::default()
            });
            let ids: Vec<&str> = filter.apply(&roster).iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["ROT-001", "ROT-002"]);
        }

        #[test]
        fn test_date_to_excludes_later_rotations() {
            let roster = roster();
            let filter = RotationFilter::from(&FilterForm {
                date_to: "2024-03-01".into(),
                ..FilterForm::default()
            });
            let ids: Vec<&str> = filter.apply(&roster).iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["ROT-003"]);
        }
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let roster = roster();
        let filter = RotationFilter::from(&FilterForm {
            base: "LSGG".into(),
            min_amount: "10".into(),
            ..FilterForm::default()
        });
        let once: Vec<Rotation> = filter.apply(&roster).into_iter().cloned().collect();
        let twice: Vec<Rotation> = filter.apply(&once).into_iter().cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_form_round_trip_keeps_inputs() {
        let form = FilterForm {
            rotation: "ROT".into(),
            date_from: "2024-03-01".into(),
            date_to: String::new(),
            base: "LFLY".into(),
            min_amount: "25.5".into(),
        };
        assert_eq!(RotationFilter::from(&form).to_form(), form);
    }
}
