// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! The yellow-pages directory: companies, rubrics, working hours and the
//! query filter over them.

use crate::objects::Coord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressComponentKind {
    Country,
    Region,
    City,
    Street,
    House,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AddressComponent {
    pub value: String,
    pub kind: AddressComponentKind,
}

/// A company address. After the map layout has run, `coords` holds the final
/// position in map pixels (`lon` is x, `lat` is y), not degrees.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Address {
    pub formatted: String,
    pub components: Vec<AddressComponent>,
    pub coords: Coord,
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Main,
    Synonym,
    Short,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompanyName {
    pub value: String,
    pub kind: NameKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneKind {
    Phone,
    Fax,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Phone {
    pub formatted: String,
    pub kind: Option<PhoneKind>,
    pub country_code: String,
    pub local_code: String,
    pub number: String,
    pub extension: String,
    pub description: String,
}

/// A working interval in minutes from the start of the week (or of the day
/// when the owning `WorkingTime` is everyday).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingInterval {
    pub minutes_from: u32,
    pub minutes_to: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkingTime {
    pub is_everyday: bool,
    /// Sorted by `minutes_to`.
    pub intervals: Vec<WorkingInterval>,
}

impl Default for WorkingTime {
    fn default() -> Self {
        WorkingTime {
            is_everyday: true,
            intervals: Vec::new(),
        }
    }
}

impl WorkingTime {
    /// How long one has to wait at `finish` (minutes from week start) until
    /// the company opens. Zero when `finish` falls inside an interval, or
    /// when no intervals are declared at all. Waiting past the last interval
    /// wraps to the first one of the next day (everyday) or week.
    pub fn wait_for_open(&self, finish: f64) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }
        let finish = if self.is_everyday {
            finish % f64::from(MINUTES_PER_DAY)
        } else {
            finish
        };
        let pos = self
            .intervals
            .partition_point(|interval| f64::from(interval.minutes_to) < finish);
        match self.intervals.get(pos) {
            Some(interval) => {
                if finish >= f64::from(interval.minutes_from) {
                    0.0
                } else {
                    f64::from(interval.minutes_from) - finish
                }
            }
            None => {
                let wrap = if self.is_everyday {
                    f64::from(MINUTES_PER_DAY)
                } else {
                    f64::from(MINUTES_PER_WEEK)
                };
                wrap - finish + f64::from(self.intervals[0].minutes_from)
            }
        }
    }
}

/// A stop a company declares within walking range.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NearbyStop {
    pub name: String,
    pub meters: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Company {
    pub address: Address,
    pub names: Vec<CompanyName>,
    pub phones: Vec<Phone>,
    pub urls: Vec<String>,
    pub rubrics: Vec<u64>,
    pub working_time: WorkingTime,
    pub nearby_stops: Vec<NearbyStop>,
}

impl Company {
    /// The MAIN name, or an empty string when the company has none.
    pub fn main_name(&self) -> &str {
        self.names
            .iter()
            .find(|name| name.kind == NameKind::Main)
            .map(|name| name.value.as_str())
            .unwrap_or("")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rubric {
    pub name: String,
    pub keywords: BTreeSet<String>,
}

/// A phone criterion of a company query. Empty string fields are wildcards,
/// except that giving either code pins the local code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhoneQuery {
    pub kind: Option<PhoneKind>,
    pub country_code: String,
    pub local_code: String,
    pub number: String,
    pub extension: String,
}

impl PhoneQuery {
    pub fn matches(&self, phone: &Phone) -> bool {
        if !self.extension.is_empty() && self.extension != phone.extension {
            return false;
        }
        if self.kind.is_some() && self.kind != phone.kind {
            return false;
        }
        if !self.country_code.is_empty() && self.country_code != phone.country_code {
            return false;
        }
        if (!self.local_code.is_empty() || !self.country_code.is_empty())
            && self.local_code != phone.local_code
        {
            return false;
        }
        self.number == phone.number
    }
}

/// A company query: a conjunction of criteria, each satisfied by at least one
/// matching entry of the company. Empty criteria are trivially satisfied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyQuery {
    pub names: Vec<String>,
    pub urls: Vec<String>,
    pub rubrics: Vec<String>,
    pub phones: Vec<PhoneQuery>,
}

impl CompanyQuery {
    /// `rubric_ids` are the resolved ids of `self.rubrics`; names unknown to
    /// the catalog resolve to nothing and can then never match.
    pub fn matches(&self, company: &Company, rubric_ids: &[u64]) -> bool {
        let names_ok = self.names.is_empty()
            || company
                .names
                .iter()
                .any(|name| self.names.iter().any(|filter| *filter == name.value));
        if !names_ok {
            return false;
        }
        let urls_ok = self.urls.is_empty()
            || company
                .urls
                .iter()
                .any(|url| self.urls.iter().any(|filter| filter == url));
        if !urls_ok {
            return false;
        }
        let rubrics_ok = self.rubrics.is_empty()
            || company
                .rubrics
                .iter()
                .any(|rubric| rubric_ids.contains(rubric));
        if !rubrics_ok {
            return false;
        }
        self.phones.is_empty()
            || company
                .phones
                .iter()
                .any(|phone| self.phones.iter().any(|filter| filter.matches(phone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn everyday(intervals: &[(u32, u32)]) -> WorkingTime {
        WorkingTime {
            is_everyday: true,
            intervals: intervals
                .iter()
                .map(|&(minutes_from, minutes_to)| WorkingInterval {
                    minutes_from,
                    minutes_to,
                })
                .collect(),
        }
    }

    #[test]
    fn no_intervals_means_always_open() {
        assert_relative_eq!(0.0, WorkingTime::default().wait_for_open(123.4));
    }

    #[test]
    fn wait_inside_and_before_an_interval() {
        let time = everyday(&[(540, 720)]);
        // arrived at 700, open until 720
        assert_relative_eq!(0.0, time.wait_for_open(700.0));
        // arrived at 500, opens at 540
        assert_relative_eq!(40.0, time.wait_for_open(500.0));
        // arrived at 800, wraps to 540 the next day
        assert_relative_eq!(1180.0, time.wait_for_open(800.0));
    }

    #[test]
    fn everyday_folds_the_finish_into_one_day() {
        let time = everyday(&[(540, 720)]);
        // day 3, 11:40
        assert_relative_eq!(0.0, time.wait_for_open(3.0 * 1440.0 + 700.0));
    }

    #[test]
    fn weekly_wraps_to_the_first_interval_of_next_week() {
        let time = WorkingTime {
            is_everyday: false,
            intervals: vec![
                WorkingInterval {
                    minutes_from: 540,
                    minutes_to: 720,
                },
                WorkingInterval {
                    minutes_from: 1440 + 540,
                    minutes_to: 1440 + 720,
                },
            ],
        };
        // Tuesday 13:00, next opening is Monday 9:00
        let finish = 1440.0 + 780.0;
        assert_relative_eq!(
            f64::from(MINUTES_PER_WEEK) - finish + 540.0,
            time.wait_for_open(finish)
        );
        // wait is always within one week
        assert!(time.wait_for_open(finish) < f64::from(MINUTES_PER_WEEK));
    }

    fn company_with_phone(number: &str, kind: Option<PhoneKind>) -> Company {
        Company {
            names: vec![CompanyName {
                value: "Dodo Pizza".to_string(),
                kind: NameKind::Main,
            }],
            phones: vec![Phone {
                number: number.to_string(),
                kind,
                ..Phone::default()
            }],
            rubrics: vec![1],
            ..Company::default()
        }
    }

    #[test]
    fn phone_query_pins_local_code_when_any_code_is_given() {
        let phone = Phone {
            country_code: "7".to_string(),
            local_code: "495".to_string(),
            number: "1234".to_string(),
            kind: Some(PhoneKind::Phone),
            ..Phone::default()
        };
        let mut query = PhoneQuery {
            number: "1234".to_string(),
            ..PhoneQuery::default()
        };
        assert!(query.matches(&phone));
        query.country_code = "7".to_string();
        // country code given, local code must now match too
        assert!(!query.matches(&phone));
        query.local_code = "495".to_string();
        assert!(query.matches(&phone));
        query.kind = Some(PhoneKind::Fax);
        assert!(!query.matches(&phone));
    }

    #[test]
    fn query_is_a_conjunction_of_existential_criteria() {
        let company = company_with_phone("1234", Some(PhoneKind::Phone));
        let query = CompanyQuery {
            rubrics: vec!["Food".to_string()],
            phones: vec![PhoneQuery {
                number: "1234".to_string(),
                kind: Some(PhoneKind::Phone),
                ..PhoneQuery::default()
            }],
            ..CompanyQuery::default()
        };
        // rubric "Food" resolved to id 1
        assert!(query.matches(&company, &[1]));
        // wrong rubric
        assert!(!query.matches(&company, &[2]));
        // unknown rubric name resolved to nothing
        assert!(!query.matches(&company, &[]));
        // wrong phone number
        let other = company_with_phone("5678", Some(PhoneKind::Phone));
        assert!(!query.matches(&other, &[1]));
    }

    #[test]
    fn empty_query_matches_everything() {
        let company = company_with_phone("1234", None);
        assert!(CompanyQuery::default().matches(&company, &[]));
        assert_eq!("Dodo Pizza", company.main_name());
    }
}
