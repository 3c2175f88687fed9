//! Single-page tasks: one form, one provider call.

use async_trait::async_trait;
use chrono::Datelike;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::registry::TaskName;
use crate::error::ProviderError;
use crate::provider::{
    BankAccountPayload, CompanyNumberPayload, DirectorPayload, EntityDocument,
    OrganisationDetailsPayload, PspProvider, VatNumberPayload,
};
use crate::validation::{self, DatePart, FieldErrors};

const NAME_MAX: usize = 100;
const ADDRESS_MAX: usize = 200;

/// Largest accepted verification document.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

const DOCUMENT_TYPES: [&str; 3] = ["application/pdf", "image/jpeg", "image/png"];

/// A task whose data is collected and committed from a single page.
#[async_trait]
pub trait TaskForm: DeserializeOwned + Serialize + Default + Send + Sync + 'static {
    const TASK: TaskName;
    const TEMPLATE: &'static str;
    const FIELDS: &'static [&'static str];

    type Payload: Send + Sync;

    fn validate(&self) -> Result<Self::Payload, FieldErrors>;

    /// The one provider call that commits the task.
    async fn send(
        provider: &dyn PspProvider,
        psp_account_id: &str,
        payload: &Self::Payload,
    ) -> Result<(), ProviderError>;
}

fn yes_no(value: &str, message: &str) -> Result<bool, String> {
    match value.trim() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(message.to_string()),
    }
}

fn optional_line(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountForm {
    #[serde(default)]
    pub sort_code: String,
    #[serde(default)]
    pub account_number: String,
}

#[async_trait]
impl TaskForm for BankAccountForm {
    const TASK: TaskName = TaskName::BankAccount;
    const TEMPLATE: &'static str = "onboarding/bank-details";
    const FIELDS: &'static [&'static str] = &["sort_code", "account_number"];

    type Payload = BankAccountPayload;

    fn validate(&self) -> Result<BankAccountPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check("sort_code", validation::sort_code(&self.sort_code));
        errors.check("account_number", validation::account_number(&self.account_number));
        errors.into_result(BankAccountPayload {
            sort_code: validation::compact_digits(&self.sort_code),
            account_number: validation::compact_digits(&self.account_number),
        })
    }

    async fn send(
        provider: &dyn PspProvider,
        psp_account_id: &str,
        payload: &BankAccountPayload,
    ) -> Result<(), ProviderError> {
        provider.update_bank_account(psp_account_id, payload).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyNumberForm {
    #[serde(default)]
    pub has_company_number: String,
    #[serde(default)]
    pub company_number: String,
}

#[async_trait]
impl TaskForm for CompanyNumberForm {
    const TASK: TaskName = TaskName::CompanyNumber;
    const TEMPLATE: &'static str = "onboarding/company-number";
    const FIELDS: &'static [&'static str] = &["has_company_number", "company_number"];

    type Payload = CompanyNumberPayload;

    fn validate(&self) -> Result<CompanyNumberPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let registered = match yes_no(
            &self.has_company_number,
            "Select yes if your organisation is registered with Companies House",
        ) {
            Ok(registered) => registered,
            Err(message) => {
                errors.add("has_company_number", message);
                false
            }
        };
        if registered {
            errors.check("company_number", validation::company_number(&self.company_number));
        }
        errors.into_result(CompanyNumberPayload {
            company_number: registered
                .then(|| validation::compact_digits(&self.company_number).to_uppercase()),
        })
    }

    async fn send(
        provider: &dyn PspProvider,
        psp_account_id: &str,
        payload: &CompanyNumberPayload,
    ) -> Result<(), ProviderError> {
        provider.update_company_number(psp_account_id, payload).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatNumberForm {
    #[serde(default)]
    pub has_vat_number: String,
    #[serde(default)]
    pub vat_number: String,
}

#[async_trait]
impl TaskForm for VatNumberForm {
    const TASK: TaskName = TaskName::VatNumber;
    const TEMPLATE: &'static str = "onboarding/vat-number";
    const FIELDS: &'static [&'static str] = &["has_vat_number", "vat_number"];

    type Payload = VatNumberPayload;

    fn validate(&self) -> Result<VatNumberPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let registered = match yes_no(
            &self.has_vat_number,
            "Select yes if your organisation is registered for VAT",
        ) {
            Ok(registered) => registered,
            Err(message) => {
                errors.add("has_vat_number", message);
                false
            }
        };
        if registered {
            errors.check("vat_number", validation::vat_number(&self.vat_number));
        }
        errors.into_result(VatNumberPayload {
            vat_number: registered
                .then(|| validation::compact_digits(&self.vat_number).to_uppercase()),
        })
    }

    async fn send(
        provider: &dyn PspProvider,
        psp_account_id: &str,
        payload: &VatNumberPayload,
    ) -> Result<(), ProviderError> {
        provider.update_vat_number(psp_account_id, payload).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorForm {
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
    #[serde(default)]
    pub email: String,
}

#[async_trait]
impl TaskForm for DirectorForm {
    const TASK: TaskName = TaskName::Director;
    const TEMPLATE: &'static str = "onboarding/director";
    const FIELDS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "dob_day",
        "dob_month",
        "dob_year",
        "email",
    ];

    type Payload = DirectorPayload;

    fn validate(&self) -> Result<DirectorPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            "first_name",
            validation::mandatory_text(&self.first_name, NAME_MAX, "First name", "Enter the first name"),
        );
        errors.check(
            "last_name",
            validation::mandatory_text(&self.last_name, NAME_MAX, "Last name", "Enter the last name"),
        );
        let dob = validation::date_of_birth(&self.dob_day, &self.dob_month, &self.dob_year);
        if let Err((part, message)) = &dob {
            let field = match part {
                DatePart::Day | DatePart::Whole => "dob_day",
                DatePart::Month => "dob_month",
                DatePart::Year => "dob_year",
            };
            errors.add(field, message.clone());
        }
        errors.check("email", validation::email(&self.email));

        let Ok(dob) = dob else {
            return Err(errors);
        };
        errors.into_result(DirectorPayload {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            dob_day: dob.day(),
            dob_month: dob.month(),
            dob_year: dob.year(),
            email: self.email.trim().to_string(),
        })
    }

    async fn send(
        provider: &dyn PspProvider,
        psp_account_id: &str,
        payload: &DirectorPayload,
    ) -> Result<(), ProviderError> {
        provider.update_director(psp_account_id, payload).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationDetailsForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub address_city: String,
    #[serde(default)]
    pub address_postcode: String,
}

#[async_trait]
impl TaskForm for OrganisationDetailsForm {
    const TASK: TaskName = TaskName::OrganisationDetails;
    const TEMPLATE: &'static str = "onboarding/organisation-details";
    const FIELDS: &'static [&'static str] = &[
        "name",
        "address_line1",
        "address_line2",
        "address_city",
        "address_postcode",
    ];

    type Payload = OrganisationDetailsPayload;

    fn validate(&self) -> Result<OrganisationDetailsPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            "name",
            validation::mandatory_text(&self.name, ADDRESS_MAX, "Organisation name", "Enter the name of your organisation"),
        );
        errors.check(
            "address_line1",
            validation::mandatory_text(
                &self.address_line1,
                ADDRESS_MAX,
                "Building and street",
                "Enter a building and street",
            ),
        );
        errors.check(
            "address_line2",
            validation::max_length(&self.address_line2, ADDRESS_MAX, "Building and street"),
        );
        errors.check(
            "address_city",
            validation::mandatory_text(&self.address_city, ADDRESS_MAX, "Town or city", "Enter a town or city"),
        );
        errors.check("address_postcode", validation::postcode(&self.address_postcode));
        errors.into_result(OrganisationDetailsPayload {
            name: self.name.trim().to_string(),
            address_line1: self.address_line1.trim().to_string(),
            address_line2: optional_line(&self.address_line2),
            address_city: self.address_city.trim().to_string(),
            address_postcode: self.address_postcode.trim().to_uppercase(),
        })
    }

    async fn send(
        provider: &dyn PspProvider,
        psp_account_id: &str,
        payload: &OrganisationDetailsPayload,
    ) -> Result<(), ProviderError> {
        provider.update_organisation_details(psp_account_id, payload).await
    }
}

/// Form field carrying the uploaded document.
pub const DOCUMENT_FIELD: &str = "government_entity_document";

pub const DOCUMENT_TEMPLATE: &str = "onboarding/government-entity-document";

/// Check an uploaded verification document before it is sent on.
pub fn validate_document(
    file_name: Option<&str>,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<EntityDocument, FieldErrors> {
    let mut errors = FieldErrors::new();
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if bytes.is_empty() {
        errors.add(DOCUMENT_FIELD, "Select a file to upload");
    } else if bytes.len() > MAX_DOCUMENT_BYTES {
        errors.add(DOCUMENT_FIELD, "The selected file must be smaller than 10MB");
    } else if !DOCUMENT_TYPES.contains(&content_type.as_str()) {
        errors.add(DOCUMENT_FIELD, "The selected file must be a PDF, JPG or PNG");
    }
    let file_name = file_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("document")
        .to_string();
    errors.into_result(EntityDocument {
        file_name,
        content_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_details_are_compacted() {
        let payload = BankAccountForm {
            sort_code: "30-94-30".into(),
            account_number: "0073 3445".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(payload.sort_code, "309430");
        assert_eq!(payload.account_number, "00733445");
    }

    #[test]
    fn bank_details_report_both_fields() {
        let errors = BankAccountForm::default().validate().unwrap_err();
        assert_eq!(errors.get("sort_code"), Some("Enter a sort code"));
        assert_eq!(errors.get("account_number"), Some("Enter an account number"));
    }

    #[test]
    fn company_number_requires_an_answer() {
        let errors = CompanyNumberForm::default().validate().unwrap_err();
        assert!(errors.get("has_company_number").is_some());
        assert!(errors.get("company_number").is_none());
    }

    #[test]
    fn company_number_no_sends_nothing() {
        let payload = CompanyNumberForm {
            has_company_number: "no".into(),
            company_number: "ignored".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(payload.company_number, None);
    }

    #[test]
    fn company_number_yes_is_validated() {
        let form = CompanyNumberForm {
            has_company_number: "yes".into(),
            company_number: "sc123456".into(),
        };
        assert_eq!(form.validate().unwrap().company_number.as_deref(), Some("SC123456"));

        let bad = CompanyNumberForm {
            has_company_number: "yes".into(),
            company_number: "123".into(),
        };
        assert!(bad.validate().unwrap_err().get("company_number").is_some());
    }

    #[test]
    fn vat_number_strips_separators() {
        let payload = VatNumberForm {
            has_vat_number: "yes".into(),
            vat_number: "GB 123 4567 89".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(payload.vat_number.as_deref(), Some("GB123456789"));
    }

    #[test]
    fn director_date_is_coerced() {
        let payload = DirectorForm {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            dob_day: "9".into(),
            dob_month: "12".into(),
            dob_year: "1956".into(),
            email: "grace@example.com".into(),
        }
        .validate()
        .unwrap();
        assert_eq!((payload.dob_day, payload.dob_month, payload.dob_year), (9, 12, 1956));
    }

    #[test]
    fn director_bad_month_lands_on_month() {
        let errors = DirectorForm {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            dob_day: "9".into(),
            dob_month: "13".into(),
            dob_year: "1956".into(),
            email: "grace@example.com".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("dob_month"), Some("Enter a valid month"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn organisation_line2_is_optional() {
        let payload = OrganisationDetailsForm {
            name: "Borough Council".into(),
            address_line1: "Town Hall".into(),
            address_line2: " ".into(),
            address_city: "Leeds".into(),
            address_postcode: "ls1 1ur".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(payload.address_line2, None);
        assert_eq!(payload.address_postcode, "LS1 1UR");
    }

    #[test]
    fn document_checks() {
        let ok = validate_document(Some("cert.pdf"), Some("application/pdf"), vec![1, 2, 3]).unwrap();
        assert_eq!(ok.file_name, "cert.pdf");

        let empty = validate_document(Some("cert.pdf"), Some("application/pdf"), Vec::new());
        assert_eq!(
            empty.unwrap_err().get(DOCUMENT_FIELD),
            Some("Select a file to upload")
        );

        let wrong_type = validate_document(Some("cert.docx"), Some("application/msword"), vec![1]);
        assert!(wrong_type.is_err());

        let too_big = validate_document(None, Some("image/png"), vec![0; MAX_DOCUMENT_BYTES + 1]);
        assert_eq!(
            too_big.unwrap_err().get(DOCUMENT_FIELD),
            Some("The selected file must be smaller than 10MB")
        );
    }
}
