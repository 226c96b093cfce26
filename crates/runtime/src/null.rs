/// Reject an absent argument.
///
/// # Panics
///
/// Panics when `value` is `None`, naming the parameter. Generated code
/// calls this for parameters whose null policy is `Reject`.
#[track_caller]
pub fn check_present<T>(name: &str, value: &Option<T>) {
    if value.is_none() {
        panic!("{}: value is required but was absent", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_value_passes() {
        check_present("nick", &Some("x"));
    }

    #[test]
    #[should_panic(expected = "nick: value is required")]
    fn test_absent_value_panics() {
        check_present::<String>("nick", &None);
    }
}
