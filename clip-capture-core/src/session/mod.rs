pub mod capture;

#[cfg(test)]
pub(crate) mod test_support;
