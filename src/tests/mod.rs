
mod form_tests;
