//! Responsible person: the compound task.
//!
//! Four pages in a fixed order: name and date of birth → home address →
//! contact details → check answers. The first three each write their own
//! draft sections; the last reads the whole draft and commits it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::draft::{ContactDetails, DateOfBirth, Draft, DraftUpdate, HomeAddress, PersonName};
use super::registry::{TaskName, TaskRegistry, onboarding_root};
use crate::provider::ResponsiblePersonPayload;
use crate::validation::{self, DatePart, FieldErrors};

const NAME_MAX: usize = 100;
const ADDRESS_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsiblePersonPage {
    Name,
    HomeAddress,
    ContactDetails,
    CheckAnswers,
}

impl ResponsiblePersonPage {
    pub const ALL: [Self; 4] = [
        Self::Name,
        Self::HomeAddress,
        Self::ContactDetails,
        Self::CheckAnswers,
    ];

    /// Path segment below the task's own page path.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Name => "",
            Self::HomeAddress => "/home-address",
            Self::ContactDetails => "/contact-details",
            Self::CheckAnswers => "/check-answers",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::Name => "onboarding/responsible-person/name",
            Self::HomeAddress => "onboarding/responsible-person/home-address",
            Self::ContactDetails => "onboarding/responsible-person/contact-details",
            Self::CheckAnswers => "onboarding/responsible-person/check-answers",
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Name => Some(Self::HomeAddress),
            Self::HomeAddress => Some(Self::ContactDetails),
            Self::ContactDetails => Some(Self::CheckAnswers),
            Self::CheckAnswers => None,
        }
    }

    /// Form fields the page renders, used to scope provider errors.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Name => &["first_name", "last_name", "dob_day", "dob_month", "dob_year"],
            Self::HomeAddress => &[
                "home_address_line_1",
                "home_address_line_2",
                "home_address_city",
                "home_address_postcode",
            ],
            Self::ContactDetails => &["telephone_number", "email"],
            // The review page shows every answer, so every field is addressable.
            Self::CheckAnswers => &[
                "first_name",
                "last_name",
                "dob_day",
                "dob_month",
                "dob_year",
                "home_address_line_1",
                "home_address_line_2",
                "home_address_city",
                "home_address_postcode",
                "telephone_number",
                "email",
            ],
        }
    }

    pub fn href(&self, account_id: &str) -> String {
        let base = TaskRegistry::standard()
            .get(TaskName::ResponsiblePerson)
            .map(|task| task.href(account_id))
            .unwrap_or_else(|| format!("{}/responsible-person", onboarding_root(account_id)));
        format!("{base}{}", self.segment())
    }
}

/// The first page whose section the draft still lacks, if any.
pub fn first_missing_page(draft: &Draft) -> Option<ResponsiblePersonPage> {
    if draft.name.is_none() || draft.dob.is_none() {
        Some(ResponsiblePersonPage::Name)
    } else if draft.address.is_none() {
        Some(ResponsiblePersonPage::HomeAddress)
    } else if draft.contact.is_none() {
        Some(ResponsiblePersonPage::ContactDetails)
    } else {
        None
    }
}

fn date_error_field(part: DatePart) -> &'static str {
    match part {
        DatePart::Day | DatePart::Whole => "dob_day",
        DatePart::Month => "dob_month",
        DatePart::Year => "dob_year",
    }
}

/// A data-entry page of the responsible-person flow. Each page owns the
/// draft sections it writes.
pub trait SectionForm: DeserializeOwned + Serialize + Default + Send + Sync + 'static {
    const PAGE: ResponsiblePersonPage;

    /// Prefill from whatever the draft already holds.
    fn from_draft(draft: &Draft) -> Self;

    fn validate(&self) -> Result<Vec<DraftUpdate>, FieldErrors>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub dob_day: String,
    #[serde(default)]
    pub dob_month: String,
    #[serde(default)]
    pub dob_year: String,
}

impl SectionForm for NameForm {
    const PAGE: ResponsiblePersonPage = ResponsiblePersonPage::Name;

    fn from_draft(draft: &Draft) -> Self {
        let name = draft.name.clone().unwrap_or_default();
        let dob = draft.dob.clone().unwrap_or_default();
        Self {
            first_name: name.first_name,
            last_name: name.last_name,
            dob_day: dob.day,
            dob_month: dob.month,
            dob_year: dob.year,
        }
    }

    fn validate(&self) -> Result<Vec<DraftUpdate>, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            "first_name",
            validation::mandatory_text(&self.first_name, NAME_MAX, "First name", "Enter the first name"),
        );
        errors.check(
            "last_name",
            validation::mandatory_text(&self.last_name, NAME_MAX, "Last name", "Enter the last name"),
        );
        if let Err((part, message)) =
            validation::date_of_birth(&self.dob_day, &self.dob_month, &self.dob_year)
        {
            errors.add(date_error_field(part), message);
        }
        errors.into_result(vec![
            DraftUpdate::Name(PersonName {
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
            }),
            DraftUpdate::Dob(DateOfBirth {
                day: self.dob_day.trim().to_string(),
                month: self.dob_month.trim().to_string(),
                year: self.dob_year.trim().to_string(),
            }),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub home_address_line_1: String,
    #[serde(default)]
    pub home_address_line_2: String,
    #[serde(default)]
    pub home_address_city: String,
    #[serde(default)]
    pub home_address_postcode: String,
}

impl SectionForm for AddressForm {
    const PAGE: ResponsiblePersonPage = ResponsiblePersonPage::HomeAddress;

    fn from_draft(draft: &Draft) -> Self {
        let address = draft.address.clone().unwrap_or_default();
        Self {
            home_address_line_1: address.line1,
            home_address_line_2: address.line2,
            home_address_city: address.city,
            home_address_postcode: address.postcode,
        }
    }

    fn validate(&self) -> Result<Vec<DraftUpdate>, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            "home_address_line_1",
            validation::mandatory_text(
                &self.home_address_line_1,
                ADDRESS_MAX,
                "Building and street",
                "Enter a building and street",
            ),
        );
        errors.check(
            "home_address_line_2",
            validation::max_length(&self.home_address_line_2, ADDRESS_MAX, "Building and street"),
        );
        errors.check(
            "home_address_city",
            validation::mandatory_text(&self.home_address_city, ADDRESS_MAX, "Town or city", "Enter a town or city"),
        );
        errors.check("home_address_postcode", validation::postcode(&self.home_address_postcode));
        errors.into_result(vec![DraftUpdate::Address(HomeAddress {
            line1: self.home_address_line_1.trim().to_string(),
            line2: self.home_address_line_2.trim().to_string(),
            city: self.home_address_city.trim().to_string(),
            postcode: self.home_address_postcode.trim().to_uppercase(),
        })])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub telephone_number: String,
    #[serde(default)]
    pub email: String,
}

impl SectionForm for ContactForm {
    const PAGE: ResponsiblePersonPage = ResponsiblePersonPage::ContactDetails;

    fn from_draft(draft: &Draft) -> Self {
        let contact = draft.contact.clone().unwrap_or_default();
        Self {
            telephone_number: contact.telephone_number,
            email: contact.email,
        }
    }

    fn validate(&self) -> Result<Vec<DraftUpdate>, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check("telephone_number", validation::phone(&self.telephone_number));
        errors.check("email", validation::email(&self.email));
        errors.into_result(vec![DraftUpdate::Contact(ContactDetails {
            telephone_number: self.telephone_number.trim().to_string(),
            email: self.email.trim().to_string(),
        })])
    }
}

/// Flatten a complete draft into the provider's shape.
///
/// Returns the page to revisit when a section is missing or its stored values
/// cannot be coerced.
pub fn build_payload(draft: &Draft) -> Result<ResponsiblePersonPayload, ResponsiblePersonPage> {
    if let Some(page) = first_missing_page(draft) {
        return Err(page);
    }
    let (Some(name), Some(dob), Some(address), Some(contact)) =
        (&draft.name, &draft.dob, &draft.address, &draft.contact)
    else {
        return Err(ResponsiblePersonPage::Name);
    };

    let dob_day = dob.day.trim().parse().map_err(|_| ResponsiblePersonPage::Name)?;
    let dob_month = dob.month.trim().parse().map_err(|_| ResponsiblePersonPage::Name)?;
    let dob_year = dob.year.trim().parse().map_err(|_| ResponsiblePersonPage::Name)?;

    let line2 = address.line2.trim();
    Ok(ResponsiblePersonPayload {
        first_name: name.first_name.trim().to_string(),
        last_name: name.last_name.trim().to_string(),
        address_line1: address.line1.trim().to_string(),
        address_line2: (!line2.is_empty()).then(|| line2.to_string()),
        address_city: address.city.trim().to_string(),
        address_postcode: address.postcode.trim().to_string(),
        dob_day,
        dob_month,
        dob_year,
        phone: validation::normalise_phone(&contact.telephone_number),
        email: contact.email.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> Draft {
        let mut draft = Draft::default();
        let name = NameForm {
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
            dob_day: "10".into(),
            dob_month: "12".into(),
            dob_year: "1985".into(),
        };
        let address = AddressForm {
            home_address_line_1: "1 Street".into(),
            home_address_line_2: "  ".into(),
            home_address_city: "London".into(),
            home_address_postcode: "sw1a 1aa".into(),
        };
        let contact = ContactForm {
            telephone_number: "01632 960 001".into(),
            email: "ada@example.com".into(),
        };
        for update in name
            .validate()
            .unwrap()
            .into_iter()
            .chain(address.validate().unwrap())
            .chain(contact.validate().unwrap())
        {
            draft.apply(update);
        }
        draft
    }

    #[test]
    fn pages_walk_in_order() {
        let mut page = ResponsiblePersonPage::Name;
        let mut seen = vec![page];
        while let Some(next) = page.next() {
            seen.push(next);
            page = next;
        }
        assert_eq!(seen, ResponsiblePersonPage::ALL.to_vec());
    }

    #[test]
    fn hrefs_sit_under_the_task_page() {
        assert_eq!(
            ResponsiblePersonPage::Name.href("5"),
            "/accounts/5/onboarding/responsible-person"
        );
        assert_eq!(
            ResponsiblePersonPage::CheckAnswers.href("5"),
            "/accounts/5/onboarding/responsible-person/check-answers"
        );
    }

    #[test]
    fn name_form_reports_each_bad_field() {
        let form = NameForm {
            first_name: String::new(),
            last_name: "x".repeat(NAME_MAX + 1),
            dob_day: "1".into(),
            dob_month: "1".into(),
            dob_year: "19".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("first_name"), Some("Enter the first name"));
        assert!(errors.get("last_name").is_some());
        assert_eq!(errors.get("dob_year"), Some("Enter a valid year"));
    }

    #[test]
    fn name_form_produces_name_and_dob_sections() {
        let updates = NameForm {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            dob_day: "10".into(),
            dob_month: "12".into(),
            dob_year: "1985".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(updates.len(), 2);
        assert!(matches!(updates[0], DraftUpdate::Name(_)));
        assert!(matches!(updates[1], DraftUpdate::Dob(_)));
    }

    #[test]
    fn address_and_contact_validation() {
        let errors = AddressForm::default().validate().unwrap_err();
        assert!(errors.get("home_address_line_1").is_some());
        assert!(errors.get("home_address_city").is_some());
        assert!(errors.get("home_address_postcode").is_some());
        assert!(errors.get("home_address_line_2").is_none());

        let errors = ContactForm {
            telephone_number: "abc".into(),
            email: "nope".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn missing_sections_point_at_their_page() {
        let mut draft = complete_draft();
        assert_eq!(first_missing_page(&draft), None);

        draft.contact = None;
        assert_eq!(
            first_missing_page(&draft),
            Some(ResponsiblePersonPage::ContactDetails)
        );
        draft.address = None;
        assert_eq!(
            first_missing_page(&draft),
            Some(ResponsiblePersonPage::HomeAddress)
        );
        draft.dob = None;
        assert_eq!(first_missing_page(&draft), Some(ResponsiblePersonPage::Name));
        assert_eq!(build_payload(&draft), Err(ResponsiblePersonPage::Name));
    }

    #[test]
    fn payload_is_flattened_and_coerced() {
        let payload = build_payload(&complete_draft()).unwrap();
        assert_eq!(payload.first_name, "Ada");
        assert_eq!(payload.dob_day, 10);
        assert_eq!(payload.dob_month, 12);
        assert_eq!(payload.dob_year, 1985);
        assert_eq!(payload.address_line2, None);
        assert_eq!(payload.address_postcode, "SW1A 1AA");
        assert_eq!(payload.phone, "+441632960001");

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("address_line2").is_none());
        assert_eq!(json["dob_year"], 1985);
    }

    #[test]
    fn uncoercible_dob_sends_user_back_to_name_page() {
        let mut draft = complete_draft();
        draft.dob.as_mut().unwrap().year = "19x5".into();
        assert_eq!(build_payload(&draft), Err(ResponsiblePersonPage::Name));
    }

    #[test]
    fn form_prefill_round_trips_through_draft() {
        let draft = complete_draft();
        let form = ContactForm::from_draft(&draft);
        assert_eq!(form.telephone_number, "01632 960 001");
        assert_eq!(NameForm::from_draft(&Draft::default()), NameForm::default());
    }
}
