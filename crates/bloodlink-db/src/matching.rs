//! Donor matching: windowed filter over open donation requests, rejection
//! anti-join, and a lexicographic rank on location/sex/age agreement.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rusqlite::params;

use bloodlink_types::models::{BloodType, DonationStatus, Sex};

use crate::Database;
use crate::models::DonationRequestRow;
use crate::queries::{DONATION_REQUEST_COLUMNS, OptionalExt, map_donation_request};

/// Due dates are eligible within this many days of the donor's next
/// available donation date, inclusive. Fixed, not configurable.
pub const DUE_DATE_WINDOW_DAYS: i64 = 7;

/// A stored age counts as an age match within this many years of the
/// donor's age, inclusive. Fixed, not configurable.
pub const AGE_WINDOW_YEARS: i64 = 5;

/// A candidate donor's attributes, as submitted with a match query.
#[derive(Debug, Clone)]
pub struct MatchCriteria<'a> {
    pub blood_type: BloodType,
    pub sex: Sex,
    pub location: &'a str,
    pub age: i64,
    pub next_donation_date: NaiveDate,
}

#[derive(Debug)]
pub enum SelectOutcome {
    Selected { donator_registered_id: String },
    /// Same user selecting again: no second row, same payload.
    AlreadySelected { donator_registered_id: String },
    /// Another user already holds the request.
    AlreadyMatched,
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RejectOutcome {
    Rejected,
    AlreadyRejected,
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    NotRequester,
    InvalidStatus(String),
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Reopened,
    NotSelected,
    InvalidStatus(String),
    NotFound,
}

impl Database {
    /// Best open donation request for the given donor, or `None`.
    ///
    /// Blood type and the ±7-day due-date window are hard filters; requests
    /// the user has rejected are excluded outright. Location, sex, and the
    /// ±5-year age window only score: candidates are ordered by location
    /// match, then sex match, then age match (not a summed score), with
    /// oldest-first insertion order breaking ties.
    pub fn find_match(
        &self,
        criteria: &MatchCriteria<'_>,
        user_id: &str,
    ) -> Result<Option<DonationRequestRow>> {
        let window = Duration::days(DUE_DATE_WINDOW_DAYS);
        let due_from = fmt_date(criteria.next_donation_date - window);
        let due_to = fmt_date(criteria.next_donation_date + window);
        let age_min = criteria.age - AGE_WINDOW_YEARS;
        let age_max = criteria.age + AGE_WINDOW_YEARS;

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DONATION_REQUEST_COLUMNS}
                 FROM donation_requests d
                 WHERE d.blood_type = ?1
                   AND d.status IN ('open', 'reopened')
                   AND d.donation_due_date BETWEEN ?2 AND ?3
                   AND NOT EXISTS (
                       SELECT 1 FROM rejected_matches r
                       WHERE r.donation_request_id = d.id AND r.user_id = ?4
                   )
                 ORDER BY (d.location = ?5) DESC,
                          (d.sex = ?6) DESC,
                          (d.age BETWEEN ?7 AND ?8) DESC,
                          d.created_at ASC, d.rowid ASC
                 LIMIT 1"
            ))?;

            let row = stmt
                .query_row(
                    params![
                        criteria.blood_type.as_str(),
                        due_from,
                        due_to,
                        user_id,
                        criteria.location,
                        criteria.sex.as_str(),
                        age_min,
                        age_max,
                    ],
                    map_donation_request,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Record that `user_id` accepts the match and reveal the verified
    /// registration id. Insert and status transition commit as one
    /// transaction so two users cannot both take the same request.
    pub fn select_match(
        &self,
        id: &str,
        user_id: &str,
        donation_request_id: &str,
    ) -> Result<SelectOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let request: Option<(String, String)> = tx
                .query_row(
                    "SELECT donator_registered_id, status FROM donation_requests WHERE id = ?1",
                    [donation_request_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((donator_registered_id, status)) = request else {
                return Ok(SelectOutcome::NotFound);
            };

            let already: Option<String> = tx
                .query_row(
                    "SELECT id FROM selected_matches
                     WHERE user_id = ?1 AND donation_request_id = ?2",
                    params![user_id, donation_request_id],
                    |row| row.get(0),
                )
                .optional()?;
            if already.is_some() {
                return Ok(SelectOutcome::AlreadySelected {
                    donator_registered_id,
                });
            }

            let matchable = DonationStatus::parse(&status).is_some_and(DonationStatus::is_matchable);
            if !matchable {
                return Ok(SelectOutcome::AlreadyMatched);
            }

            tx.execute(
                "INSERT INTO selected_matches (id, user_id, donation_request_id)
                 VALUES (?1, ?2, ?3)",
                params![id, user_id, donation_request_id],
            )?;
            tx.execute(
                "UPDATE donation_requests SET status = ?1 WHERE id = ?2",
                params![DonationStatus::Selected.as_str(), donation_request_id],
            )?;
            tx.commit()?;

            Ok(SelectOutcome::Selected {
                donator_registered_id,
            })
        })
    }

    /// Record that `user_id` declines the match; the pair is never offered
    /// again. Rejecting twice is a no-op reported as such.
    pub fn reject_match(
        &self,
        id: &str,
        user_id: &str,
        donation_request_id: &str,
    ) -> Result<RejectOutcome> {
        self.with_conn_mut(|conn| {
            let exists: Option<String> = conn
                .query_row(
                    "SELECT id FROM donation_requests WHERE id = ?1",
                    [donation_request_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(RejectOutcome::NotFound);
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO rejected_matches (id, user_id, donation_request_id)
                 VALUES (?1, ?2, ?3)",
                params![id, user_id, donation_request_id],
            )?;
            Ok(if inserted == 0 {
                RejectOutcome::AlreadyRejected
            } else {
                RejectOutcome::Rejected
            })
        })
    }

    /// Requester-side acknowledgement: `selected → confirmed`.
    pub fn confirm_match(&self, user_id: &str, donation_request_id: &str) -> Result<ConfirmOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let request: Option<(String, String)> = tx
                .query_row(
                    "SELECT requester_id, status FROM donation_requests WHERE id = ?1",
                    [donation_request_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((requester_id, status)) = request else {
                return Ok(ConfirmOutcome::NotFound);
            };
            if requester_id != user_id {
                return Ok(ConfirmOutcome::NotRequester);
            }
            if status != DonationStatus::Selected.as_str() {
                return Ok(ConfirmOutcome::InvalidStatus(status));
            }

            tx.execute(
                "UPDATE donation_requests SET status = ?1 WHERE id = ?2",
                params![DonationStatus::Confirmed.as_str(), donation_request_id],
            )?;
            tx.commit()?;
            Ok(ConfirmOutcome::Confirmed)
        })
    }

    /// The selecting donor backs out: their selection row is removed and the
    /// request reopens for matching.
    pub fn cancel_match(&self, user_id: &str, donation_request_id: &str) -> Result<CancelOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM donation_requests WHERE id = ?1",
                    [donation_request_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(status) = status else {
                return Ok(CancelOutcome::NotFound);
            };
            if status != DonationStatus::Selected.as_str() {
                return Ok(CancelOutcome::InvalidStatus(status));
            }

            let removed = tx.execute(
                "DELETE FROM selected_matches WHERE user_id = ?1 AND donation_request_id = ?2",
                params![user_id, donation_request_id],
            )?;
            if removed == 0 {
                return Ok(CancelOutcome::NotSelected);
            }

            tx.execute(
                "UPDATE donation_requests SET status = ?1 WHERE id = ?2",
                params![DonationStatus::Reopened.as_str(), donation_request_id],
            )?;
            tx.commit()?;
            Ok(CancelOutcome::Reopened)
        })
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDonationRequest;
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "argon2-hash").unwrap();
        id
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct RequestSpec<'a> {
        blood_type: &'a str,
        sex: &'a str,
        location: &'a str,
        age: i64,
        due: NaiveDate,
    }

    fn insert_request(db: &Database, requester: &str, spec: &RequestSpec<'_>) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_donation_request(&NewDonationRequest {
            id: &id,
            requester_id: requester,
            name: "Jane Doe",
            age: spec.age,
            sex: spec.sex,
            blood_type: spec.blood_type,
            content: "please help",
            image_key: None,
            location: spec.location,
            donation_due_date: &spec.due.format("%Y-%m-%d").to_string(),
            donator_registered_id: "123456-7890",
        })
        .unwrap();
        id
    }

    fn criteria(next: NaiveDate) -> MatchCriteria<'static> {
        MatchCriteria {
            blood_type: BloodType::ANegative,
            sex: Sex::Male,
            location: "Seoul",
            age: 35,
            next_donation_date: next,
        }
    }

    const BASE: (i32, u32, u32) = (2025, 5, 6);

    fn base_date() -> NaiveDate {
        date(BASE.0, BASE.1, BASE.2)
    }

    fn rejected_rows(db: &Database, user_id: &str) -> i64 {
        db.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM rejected_matches WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .unwrap()
    }

    fn request_status(db: &Database, id: &str) -> String {
        db.get_donation_request(id).unwrap().unwrap().status
    }

    #[test]
    fn due_date_window_is_seven_days_inclusive() {
        let db = db();
        let requester = user(&db, "requester");
        let spec = RequestSpec {
            blood_type: "A-",
            sex: "M",
            location: "Seoul",
            age: 35,
            due: base_date(),
        };
        insert_request(&db, &requester, &spec);
        let donor = user(&db, "donor");

        for offset in [-7i64, 0, 7] {
            let next = base_date() + Duration::days(offset);
            let found = db.find_match(&criteria(next), &donor).unwrap();
            assert!(found.is_some(), "offset {offset} should match");
        }
        for offset in [-8i64, 8] {
            let next = base_date() + Duration::days(offset);
            let found = db.find_match(&criteria(next), &donor).unwrap();
            assert!(found.is_none(), "offset {offset} should not match");
        }
    }

    #[test]
    fn blood_type_is_a_hard_filter() {
        let db = db();
        let requester = user(&db, "requester");
        insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A+",
                sex: "M",
                location: "Seoul",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        // criteria() asks for A-; the stored A+ request must never surface
        assert!(db.find_match(&criteria(base_date()), &donor).unwrap().is_none());
    }

    #[test]
    fn rejected_requests_are_never_offered_again() {
        let db = db();
        let requester = user(&db, "requester");
        let request = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Seoul",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        let outcome = db
            .reject_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        assert_eq!(outcome, RejectOutcome::Rejected);
        assert!(db.find_match(&criteria(base_date()), &donor).unwrap().is_none());

        // the rejection is personal; other donors still see the request
        let other = user(&db, "other");
        assert!(db.find_match(&criteria(base_date()), &other).unwrap().is_some());
    }

    #[test]
    fn reject_is_idempotent_with_a_single_row() {
        let db = db();
        let requester = user(&db, "requester");
        let request = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Seoul",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        let first = db
            .reject_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        let second = db
            .reject_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        assert_eq!(first, RejectOutcome::Rejected);
        assert_eq!(second, RejectOutcome::AlreadyRejected);
        assert_eq!(rejected_rows(&db, &donor), 1);
    }

    #[test]
    fn reject_unknown_request_reports_not_found() {
        let db = db();
        let donor = user(&db, "donor");
        let outcome = db
            .reject_match(&Uuid::new_v4().to_string(), &donor, "no-such-request")
            .unwrap();
        assert_eq!(outcome, RejectOutcome::NotFound);
    }

    #[test]
    fn location_match_outranks_sex_and_age_together() {
        let db = db();
        let requester = user(&db, "requester");
        // matches location only
        let location_only = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "F",
                location: "Seoul",
                age: 60,
                due: base_date(),
            },
        );
        // matches sex and age, but not location
        insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Busan",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        let best = db.find_match(&criteria(base_date()), &donor).unwrap().unwrap();
        assert_eq!(best.id, location_only);
    }

    #[test]
    fn sex_match_outranks_age_match() {
        let db = db();
        let requester = user(&db, "requester");
        let sex_only = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Busan",
                age: 60,
                due: base_date(),
            },
        );
        insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "F",
                location: "Busan",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        let best = db.find_match(&criteria(base_date()), &donor).unwrap().unwrap();
        assert_eq!(best.id, sex_only);
    }

    #[test]
    fn age_window_is_five_years_inclusive() {
        let db = db();
        let requester = user(&db, "requester");
        // 40 = 35 + 5 scores the age point; 41 = 35 + 6 does not
        let inside = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "F",
                location: "Busan",
                age: 40,
                due: base_date(),
            },
        );
        insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "F",
                location: "Busan",
                age: 41,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        let best = db.find_match(&criteria(base_date()), &donor).unwrap().unwrap();
        assert_eq!(best.id, inside);
    }

    #[test]
    fn scoring_is_soft_not_a_filter() {
        let db = db();
        let requester = user(&db, "requester");
        // agrees on nothing but blood type and the date window
        insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "F",
                location: "Busan",
                age: 60,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        assert!(db.find_match(&criteria(base_date()), &donor).unwrap().is_some());
    }

    #[test]
    fn equal_scores_fall_back_to_oldest_first() {
        let db = db();
        let requester = user(&db, "requester");
        let spec = RequestSpec {
            blood_type: "A-",
            sex: "M",
            location: "Seoul",
            age: 35,
            due: base_date(),
        };
        let first = insert_request(&db, &requester, &spec);
        insert_request(&db, &requester, &spec);
        let donor = user(&db, "donor");

        let best = db.find_match(&criteria(base_date()), &donor).unwrap().unwrap();
        assert_eq!(best.id, first);
    }

    #[test]
    fn select_reveals_registration_id_and_takes_the_request() {
        let db = db();
        let requester = user(&db, "requester");
        let request = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Seoul",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        let outcome = db
            .select_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        match outcome {
            SelectOutcome::Selected {
                donator_registered_id,
            } => assert_eq!(donator_registered_id, "123456-7890"),
            other => panic!("expected Selected, got {other:?}"),
        }
        assert_eq!(request_status(&db, &request), "selected");

        // a selected request leaves the matching pool
        let other_donor = user(&db, "other");
        assert!(
            db.find_match(&criteria(base_date()), &other_donor)
                .unwrap()
                .is_none()
        );

        // someone else trying to take it hits a conflict
        let stolen = db
            .select_match(&Uuid::new_v4().to_string(), &other_donor, &request)
            .unwrap();
        assert!(matches!(stolen, SelectOutcome::AlreadyMatched));

        // the original selector retrying is a no-op with the same payload
        let again = db
            .select_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        match again {
            SelectOutcome::AlreadySelected {
                donator_registered_id,
            } => assert_eq!(donator_registered_id, "123456-7890"),
            other => panic!("expected AlreadySelected, got {other:?}"),
        }
    }

    #[test]
    fn select_unknown_request_reports_not_found() {
        let db = db();
        let donor = user(&db, "donor");
        let outcome = db
            .select_match(&Uuid::new_v4().to_string(), &donor, "no-such-request")
            .unwrap();
        assert!(matches!(outcome, SelectOutcome::NotFound));
    }

    #[test]
    fn confirm_requires_the_requester_and_a_selected_request() {
        let db = db();
        let requester = user(&db, "requester");
        let request = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Seoul",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        // nothing selected yet
        assert_eq!(
            db.confirm_match(&requester, &request).unwrap(),
            ConfirmOutcome::InvalidStatus("open".into())
        );

        db.select_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();

        assert_eq!(
            db.confirm_match(&donor, &request).unwrap(),
            ConfirmOutcome::NotRequester
        );
        assert_eq!(
            db.confirm_match(&requester, &request).unwrap(),
            ConfirmOutcome::Confirmed
        );
        assert_eq!(request_status(&db, &request), "confirmed");
    }

    #[test]
    fn cancel_reopens_the_request_for_matching() {
        let db = db();
        let requester = user(&db, "requester");
        let request = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Seoul",
                age: 35,
                due: base_date(),
            },
        );
        let donor = user(&db, "donor");

        // cancel without a selection
        assert_eq!(
            db.cancel_match(&donor, &request).unwrap(),
            CancelOutcome::InvalidStatus("open".into())
        );

        db.select_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();

        // a bystander holds no selection row
        let bystander = user(&db, "bystander");
        assert_eq!(
            db.cancel_match(&bystander, &request).unwrap(),
            CancelOutcome::NotSelected
        );

        assert_eq!(db.cancel_match(&donor, &request).unwrap(), CancelOutcome::Reopened);
        assert_eq!(request_status(&db, &request), "reopened");

        // reopened requests are matchable, and the canceller may select again
        assert!(db.find_match(&criteria(base_date()), &donor).unwrap().is_some());
        let reselect = db
            .select_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        assert!(matches!(reselect, SelectOutcome::Selected { .. }));
    }

    #[test]
    fn end_to_end_match_then_reject() {
        let db = db();
        let requester = user(&db, "requester");
        let due = base_date() + Duration::days(7);
        let request = insert_request(
            &db,
            &requester,
            &RequestSpec {
                blood_type: "A-",
                sex: "M",
                location: "Seoul",
                age: 35,
                due,
            },
        );
        let donor = user(&db, "donor");

        let found = db.find_match(&criteria(base_date()), &donor).unwrap().unwrap();
        assert_eq!(found.id, request);

        db.reject_match(&Uuid::new_v4().to_string(), &donor, &request)
            .unwrap();
        assert!(db.find_match(&criteria(base_date()), &donor).unwrap().is_none());
    }
}
