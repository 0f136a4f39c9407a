pub mod loan_review;
