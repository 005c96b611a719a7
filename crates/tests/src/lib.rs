pub mod fixtures;

#[cfg(test)]
mod checklist_flow_tests;
#[cfg(test)]
mod orchestration_tests;
