//! Management funds, sponsors and the rules for recording them.

use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    database_id::{FundId, SponsorId},
    income::tier::SponsorTier,
};

/// The largest single fund or sponsorship that will be accepted, in rupees.
pub const MAX_INCOME_AMOUNT: f64 = 1_000_000.0;

/// Money given to the organisation by its parent institution.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementFund {
    pub id: FundId,
    pub amount: f64,
    pub date_received: Date,
}

/// A validated management fund that has not been stored yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewFund {
    pub amount: f64,
    pub date_received: Date,
}

/// A company or person who sponsored the event.
#[derive(Debug, Clone, PartialEq)]
pub struct Sponsor {
    pub id: SponsorId,
    pub name: String,
    pub amount: f64,
    pub date_received: Date,
    pub contact_email: Option<String>,
}

impl Sponsor {
    pub fn tier(&self) -> SponsorTier {
        SponsorTier::from_amount(self.amount)
    }
}

/// A validated sponsor that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSponsor {
    pub name: String,
    pub amount: f64,
    pub date_received: Date,
    pub contact_email: Option<String>,
}

/// The form data for creating or editing a management fund.
#[derive(Debug, Deserialize)]
pub struct FundForm {
    pub amount: f64,
    pub date_received: Date,
}

/// The form data for creating or editing a sponsor.
#[derive(Debug, Deserialize)]
pub struct SponsorForm {
    pub name: String,
    pub amount: f64,
    pub date_received: Date,
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl FundForm {
    /// Check the form against the income rules, where `today` is the local date.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] or [Error::FutureDate].
    pub fn validate(&self, today: Date) -> Result<NewFund, Error> {
        Ok(NewFund {
            amount: validate_amount(self.amount, "Fund")?,
            date_received: validate_date_received(self.date_received, today)?,
        })
    }
}

impl SponsorForm {
    /// Check the form against the sponsor rules, where `today` is the local date.
    ///
    /// # Errors
    /// Returns [Error::InvalidSponsorName], [Error::InvalidAmount],
    /// [Error::FutureDate] or [Error::InvalidEmail].
    pub fn validate(&self, today: Date) -> Result<NewSponsor, Error> {
        let name = self.name.trim();

        if name.chars().count() < 2 {
            return Err(Error::InvalidSponsorName);
        }

        Ok(NewSponsor {
            name: name.to_owned(),
            amount: validate_amount(self.amount, "Sponsorship")?,
            date_received: validate_date_received(self.date_received, today)?,
            contact_email: normalize_contact_email(self.contact_email.as_deref())?,
        })
    }
}

fn validate_amount(amount: f64, label: &str) -> Result<f64, Error> {
    if amount.is_nan() || amount <= 0.0 {
        return Err(Error::InvalidAmount(format!(
            "{label} amount must be greater than zero"
        )));
    }

    if amount > MAX_INCOME_AMOUNT {
        return Err(Error::InvalidAmount(format!(
            "{label} amount seems unusually large, amounts over ₹10,00,000 are not accepted"
        )));
    }

    Ok(amount)
}

fn validate_date_received(date_received: Date, today: Date) -> Result<Date, Error> {
    if date_received > today {
        Err(Error::FutureDate(date_received))
    } else {
        Ok(date_received)
    }
}

/// Lowercase a contact email, treating blank input as no email.
fn normalize_contact_email(email: Option<&str>) -> Result<Option<String>, Error> {
    let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
        return Ok(None);
    };

    if !email.contains('@') {
        return Err(Error::InvalidEmail(email.to_owned()));
    }

    Ok(Some(email.to_lowercase()))
}

#[cfg(test)]
mod income_validation_tests {
    use time::macros::date;

    use crate::Error;

    use super::{FundForm, SponsorForm};

    const TODAY: time::Date = date!(2025 - 06 - 15);

    fn sponsor_form(name: &str, amount: f64, email: Option<&str>) -> SponsorForm {
        SponsorForm {
            name: name.to_owned(),
            amount,
            date_received: TODAY,
            contact_email: email.map(str::to_owned),
        }
    }

    #[test]
    fn fund_amount_must_be_positive_and_at_most_a_million() {
        let valid = FundForm {
            amount: 1_000_000.0,
            date_received: TODAY,
        };
        assert!(valid.validate(TODAY).is_ok());

        for amount in [0.0, -5.0, 1_000_000.01] {
            let form = FundForm {
                amount,
                date_received: TODAY,
            };
            assert!(matches!(form.validate(TODAY), Err(Error::InvalidAmount(_))));
        }
    }

    #[test]
    fn fund_date_cannot_be_in_the_future() {
        let form = FundForm {
            amount: 100.0,
            date_received: date!(2025 - 06 - 16),
        };

        assert_eq!(
            form.validate(TODAY),
            Err(Error::FutureDate(date!(2025 - 06 - 16)))
        );
    }

    #[test]
    fn sponsor_name_is_trimmed_and_needs_two_characters() {
        assert_eq!(
            sponsor_form(" A ", 100.0, None).validate(TODAY),
            Err(Error::InvalidSponsorName)
        );

        let sponsor = sponsor_form("  Acme  ", 100.0, None).validate(TODAY).unwrap();
        assert_eq!(sponsor.name, "Acme");
    }

    #[test]
    fn sponsor_email_is_optional_and_lowercased() {
        let sponsor = sponsor_form("Acme", 100.0, Some(" Hi@Acme.COM "))
            .validate(TODAY)
            .unwrap();
        assert_eq!(sponsor.contact_email.as_deref(), Some("hi@acme.com"));

        let sponsor = sponsor_form("Acme", 100.0, Some("")).validate(TODAY).unwrap();
        assert_eq!(sponsor.contact_email, None);

        assert_eq!(
            sponsor_form("Acme", 100.0, Some("acme.com")).validate(TODAY),
            Err(Error::InvalidEmail("acme.com".to_owned()))
        );
    }
}
