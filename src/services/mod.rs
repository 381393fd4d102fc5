pub mod burndown;
pub mod codes;
pub mod hours;
pub mod onboarding;
pub mod relations;
