//! Scenarios: a plan id plus an ordered list of steps.
//!
//! The three checkout scenarios share one flow; they differ only in the plan
//! bought and in what the payment page and admin dashboard should show
//! afterwards. Each is described by a [`CheckoutPlan`] row and expanded by
//! [`CheckoutPlan::to_scenario`].

use crate::fixtures::{AdminCredentials, Fixtures};
use crate::result::{FlowError, FlowResult};
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// One flow executed against a fresh store and browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique id, also the snapshot subdirectory
    pub id: String,
    /// Plan bought by the flow, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Empty scenario
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plan: None,
            description: String::new(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append one step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Check the scenario can be executed
    pub fn validate(&self) -> FlowResult<()> {
        if self.id.trim().is_empty() {
            return Err(FlowError::config("scenario id is empty"));
        }
        if self.steps.is_empty() {
            return Err(FlowError::config(format!("scenario '{}' has no steps", self.id)));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.locator().is_some_and(|l| l.as_str().trim().is_empty()) {
                return Err(FlowError::config(format!(
                    "scenario '{}' step {index} has an empty selector",
                    self.id
                )));
            }
            if let Step::Snapshot { label } = step {
                if label.trim().is_empty() {
                    return Err(FlowError::config(format!(
                        "scenario '{}' step {index} has an empty snapshot label",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Admin dashboard page visited after checkout, with the checks made there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPage {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    pub checks: Vec<Step>,
}

impl AdminPage {
    fn new(path: &str, snapshot: Option<&str>, checks: Vec<Step>) -> Self {
        Self {
            path: path.to_string(),
            snapshot: snapshot.map(str::to_string),
            checks,
        }
    }
}

/// One row of the checkout table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPlan {
    /// Scenario id
    pub id: String,
    /// Plan id passed to `/new_customer?plan=`
    pub plan: String,
    pub description: String,
    /// Checks on the hosted payment page summary
    pub checkout: Vec<Step>,
    /// Dashboard pages checked after the order completes
    pub admin_pages: Vec<AdminPage>,
}

impl CheckoutPlan {
    /// Plan charging an upfront fee plus a weekly subscription
    #[must_use]
    pub fn subscription_and_upfront(customer_email: &str) -> Self {
        Self {
            id: "subscription_and_upfront".to_string(),
            plan: "840500cb-c663-43e6-a632-d8521bb14c42".to_string(),
            description: "Order a plan with a subscription and an upfront charge".to_string(),
            checkout: vec![
                Step::assert_text("#ProductSummary-totalAmount", "£6.99"),
                Step::assert_text("#ProductSummary-Description", "Then £5.99 per week"),
            ],
            admin_pages: vec![
                AdminPage::new(
                    "/admin/subscribers",
                    Some("view-subscribers"),
                    vec![
                        Step::assert_text(".subscriber-email", customer_email),
                        Step::assert_text(".subscription-title", "Hair Gel"),
                    ],
                ),
                AdminPage::new(
                    "/admin/transactions",
                    Some("view-transactions"),
                    vec![
                        Step::assert_text(".transaction-amount", "£6.99"),
                        Step::assert_text(".transaction-subscriber", "John"),
                    ],
                ),
                AdminPage::new(
                    "/admin/invoices",
                    Some("view-paid-invoices"),
                    vec![
                        Step::assert_text(".invoice-status", "paid"),
                        Step::assert_text(".invoice-amount-paid", "£6.99"),
                    ],
                ),
                AdminPage::new(
                    "/admin/upcoming-payments",
                    Some("view-upcoming-invoices"),
                    vec![
                        Step::assert_text(".upcoming-invoice-amount", "£5.99"),
                        Step::assert_text(".plan-price-interval", "£5.99"),
                        Step::assert_text(".plan-sell-price", "£1.00"),
                    ],
                ),
            ],
        }
    }

    /// Plan with a one-off charge and nothing recurring
    #[must_use]
    pub fn upfront_only(customer_email: &str) -> Self {
        Self {
            id: "upfront_only".to_string(),
            plan: "58921f7a-3371-4ccf-aeee-e2b8af5cca3a".to_string(),
            description: "Order a plan with only an upfront charge".to_string(),
            checkout: vec![
                Step::assert_text("#ProductSummary-totalAmount", "£5.66"),
                Step::assert_text(".Text-fontSize--16", "One-Off Soaps"),
            ],
            admin_pages: vec![
                AdminPage::new(
                    "/admin/subscribers",
                    Some("view-subscribers"),
                    vec![
                        Step::assert_text(".subscriber-email", customer_email),
                        Step::assert_text(".subscription-title", "One-Off Soaps"),
                        Step::assert_absent(".subscribers-plan-interval_amount"),
                    ],
                ),
                AdminPage::new(
                    "/admin/upcoming-payments",
                    Some("view-upcoming-invoices"),
                    vec![
                        Step::assert_absent(".upcoming-invoice-amount"),
                        Step::assert_absent(".plan-price-interval"),
                    ],
                ),
            ],
        }
    }

    /// Plan with a weekly charge and no upfront fee
    #[must_use]
    pub fn recurring_only(customer_email: &str) -> Self {
        Self {
            id: "recurring_only".to_string(),
            plan: "5813b05b-9031-45b3-b120-8fc6b1b3082e".to_string(),
            description: "Order a plan with only a recurring charge".to_string(),
            checkout: vec![
                Step::assert_text("div.mr2.flex-item.mr2.width-fixed", "£10.99"),
                Step::assert_text(".Text-fontSize--16", "Subscribe to Bath Soaps"),
            ],
            admin_pages: vec![
                AdminPage::new(
                    "/admin/subscribers",
                    Some("view-subscribers"),
                    vec![
                        Step::assert_text(".subscriber-email", customer_email),
                        Step::assert_text(".subscription-title", "Bath Soaps"),
                        Step::assert_text(".subscribers-plan-interval_amount", "£10.99"),
                        // rendered inside indented template markup
                        Step::assert_text_normalized(
                            ".subscribers-plan-sell-price",
                            "(No up-front fee)",
                        ),
                    ],
                ),
                AdminPage::new(
                    "/admin/upcoming-payments",
                    Some("view-upcoming-invoices"),
                    vec![
                        Step::assert_text(".plan-price-interval", "£10.99"),
                        Step::assert_text(".upcoming-invoices-plan-no-sell_price", "(No up-front cost)"),
                    ],
                ),
            ],
        }
    }

    /// The three plans pre-seeded in the shop
    #[must_use]
    pub fn all(customer_email: &str) -> Vec<Self> {
        vec![
            Self::subscription_and_upfront(customer_email),
            Self::upfront_only(customer_email),
            Self::recurring_only(customer_email),
        ]
    }

    /// Expand into the full signup, payment and admin verification flow
    #[must_use]
    pub fn to_scenario(&self, fixtures: &Fixtures, confirmation_timeout: Duration) -> Scenario {
        let customer = &fixtures.customer;
        let card = &fixtures.card;

        let mut scenario = Scenario::new(&self.id)
            .with_plan(&self.plan)
            .with_description(&self.description)
            .steps([
                Step::navigate("/"),
                Step::navigate(format!("/new_customer?plan={}", self.plan)),
                Step::fill("#given_name", &customer.given_name),
                Step::fill("#family_name", &customer.family_name),
                Step::fill("#email", &customer.email),
                Step::fill("#mobile", &customer.mobile),
                Step::fill("#address_line_one", &customer.address_line_one),
                Step::fill("#city", &customer.city),
                Step::fill("#postcode", &customer.postcode),
                Step::snapshot("new-customer-form"),
                Step::submit(".btn-primary"),
                Step::snapshot("begin-payment-step"),
                Step::snapshot("pre-stripe-checkout"),
                Step::click("#checkout-button"),
            ])
            .steps(self.checkout.iter().cloned())
            .steps([
                Step::fill("#cardNumber", &card.number),
                Step::fill("#cardExpiry", &card.expiry),
                Step::fill("#cardCvc", &card.cvc),
                Step::fill("#billingName", &card.billing_name),
                Step::fill("#billingPostalCode", &card.billing_postcode),
                Step::snapshot("stripe-checkout-filled-in"),
                Step::click(".SubmitButton"),
                Step::assert_text(".title", "Order Complete!").with_timeout(confirmation_timeout),
                Step::snapshot("order-complete"),
            ])
            .steps(admin_login(&fixtures.admin));

        for page in &self.admin_pages {
            scenario = scenario.step(Step::navigate(&page.path));
            if let Some(label) = &page.snapshot {
                scenario = scenario.step(Step::snapshot(label));
            }
            scenario = scenario.steps(page.checks.iter().cloned());
        }

        scenario.steps(admin_logout())
    }
}

/// Log in to the admin dashboard and confirm it loaded
pub fn admin_login(admin: &AdminCredentials) -> Vec<Step> {
    vec![
        Step::navigate("/auth/login"),
        Step::fill("#email", &admin.email),
        Step::fill("#password", &admin.password),
        Step::submit("#login"),
        Step::snapshot("logged-in"),
        Step::assert_text(".card-title", "Checklist"),
    ]
}

/// Log out of the admin dashboard and confirm it
pub fn admin_logout() -> Vec<Step> {
    vec![
        Step::navigate("/auth/logout"),
        Step::snapshot("logged-out"),
        Step::assert_text(".text-center", "You have logged out"),
    ]
}

/// A wrong password must not reach the dashboard
#[must_use]
pub fn admin_login_rejects_bad_password(admin: &AdminCredentials) -> Scenario {
    Scenario::new("admin_login_rejects_bad_password")
        .with_description("Admin login with a wrong password is refused")
        .steps([
            Step::navigate("/auth/login"),
            Step::fill("#email", &admin.email),
            Step::fill("#password", format!("{}-wrong", admin.password)),
            Step::submit("#login"),
            Step::snapshot("login-rejected"),
            Step::assert_not_text(".card-title", "Checklist"),
        ])
}

/// Every scenario shipped with the harness, in run order
#[must_use]
pub fn builtin_scenarios(fixtures: &Fixtures, confirmation_timeout: Duration) -> Vec<Scenario> {
    let mut scenarios: Vec<Scenario> = CheckoutPlan::all(&fixtures.customer.email)
        .iter()
        .map(|plan| plan.to_scenario(fixtures, confirmation_timeout))
        .collect();
    scenarios.push(admin_login_rejects_bad_password(&fixtures.admin));
    scenarios
}

/// Scenarios loaded from (or saved to) a YAML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    #[must_use]
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// Parse and validate YAML
    pub fn from_yaml(yaml: &str) -> FlowResult<Self> {
        let set: Self = serde_yaml_ng::from_str(yaml)?;
        set.validate()?;
        Ok(set)
    }

    /// Read a YAML scenario file
    pub fn load(path: &Path) -> FlowResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> FlowResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Every scenario is valid and ids are unique
    pub fn validate(&self) -> FlowResult<()> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.id.as_str()) {
                return Err(FlowError::config(format!(
                    "duplicate scenario id '{}'",
                    scenario.id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// Keep only the scenarios named in `ids`, in `ids` order
    pub fn select(&self, ids: &[String]) -> FlowResult<Vec<Scenario>> {
        if ids.is_empty() {
            return Ok(self.scenarios.clone());
        }
        ids.iter()
            .map(|id| {
                self.find(id)
                    .cloned()
                    .ok_or_else(|| FlowError::config(format!("unknown scenario '{id}'")))
            })
            .collect()
    }
}
