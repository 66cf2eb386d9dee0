//! Tests for the collaborator implementations

pub mod comparator;
