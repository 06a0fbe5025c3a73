//! Data typed into the shop during a checkout flow.

use serde::{Deserialize, Serialize};

/// Customer details entered on the signup form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    pub mobile: String,
    pub address_line_one: String,
    pub city: String,
    pub postcode: String,
}

impl Default for Customer {
    fn default() -> Self {
        Self {
            given_name: "John".to_string(),
            family_name: "Smith".to_string(),
            email: "john@example.com".to_string(),
            mobile: "07123456789".to_string(),
            address_line_one: "123 Short Road".to_string(),
            city: "London".to_string(),
            postcode: "L01 T3U".to_string(),
        }
    }
}

/// Card entered on the hosted payment page (payment provider test card)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCard {
    pub number: String,
    pub expiry: String,
    pub cvc: String,
    pub billing_name: String,
    pub billing_postcode: String,
}

impl Default for TestCard {
    fn default() -> Self {
        Self {
            number: "4242 4242 4242 4242".to_string(),
            expiry: "04 / 24".to_string(),
            cvc: "123".to_string(),
            billing_name: "John Smith".to_string(),
            billing_postcode: "LN1 7FH".to_string(),
        }
    }
}

/// Shop admin login
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl AdminCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self::new("admin@example.com", "password")
    }
}

// keep the password out of logs and reports
impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a built-in scenario types into the shop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixtures {
    pub customer: Customer,
    pub card: TestCard,
    pub admin: AdminCredentials,
}
