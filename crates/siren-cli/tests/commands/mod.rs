mod alert_test;
mod policy_test;
mod simulate_test;
mod tenant_test;
