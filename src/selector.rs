//! Choosing which base profiles get a fresh MFA session.

use log::{info, warn};

use crate::{error::RotateError, prompt::Prompt};

/// Prefix of the profiles this tool derives from a base profile.
pub const DERIVED_PREFIX: &str = "mfa-";

/// Base profiles, in the order they are given, with derived `mfa-` profiles
/// removed. The position in the returned list is the index the user types.
pub fn selectable<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| !name.starts_with(DERIVED_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Interprets one line of selection input.
///
/// `all` (any case, surrounding whitespace ignored) picks every profile.
/// Otherwise the input is a whitespace separated list of indices into
/// `selectable`; out-of-range and non-numeric tokens are dropped and repeated
/// indices count once. Returns `None` when nothing valid is left, which the
/// caller treats as a reason to ask again.
pub fn choose(selectable: &[String], input: &str) -> Option<Vec<String>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return (!selectable.is_empty()).then(|| selectable.to_vec());
    }

    let mut chosen: Vec<String> = Vec::new();
    for index in input.split_whitespace().filter_map(|t| t.parse::<usize>().ok()) {
        if let Some(name) = selectable.get(index) {
            if !chosen.contains(name) {
                chosen.push(name.clone());
            }
        }
    }

    (!chosen.is_empty()).then_some(chosen)
}

/// Lists `selectable` and keeps asking until the answer picks at least one
/// profile.
pub fn select(selectable: &[String], prompt: &mut impl Prompt) -> Result<Vec<String>, RotateError> {
    if selectable.is_empty() {
        return Err(RotateError::NoProfiles);
    }

    let question = format!(
        "\nPlease select option from above for temp credentials generation.\n\
         Type integer, integers with space or 'all' from [0 to {}]: ",
        selectable.len() - 1
    );

    loop {
        prompt.tell("\nList of all found configured AWS profiles in provided config file:");
        for (index, name) in selectable.iter().enumerate() {
            prompt.tell(&format!("\t\t{index}) {name}"));
        }
        prompt.tell("\n\t\tall) Or type 'all' for all profiles ...");

        let input = prompt
            .ask(&question)?
            .ok_or(RotateError::InputClosed("a profile selection"))?;

        match choose(selectable, &input) {
            Some(chosen) => {
                info!("Selected profiles: {}", chosen.join(", "));
                return Ok(chosen);
            }
            None => {
                warn!("Rejected profile selection {input:?}");
                prompt.tell("ERROR. Please select correct option");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::testing::ScriptedPrompt;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_selectable_drops_derived_profiles() {
        assert_eq!(selectable(["a", "mfa-a", "b"]), names(&["a", "b"]));
    }

    #[test]
    fn test_selectable_keeps_names_merely_containing_mfa() {
        assert_eq!(
            selectable(["my-mfa-x", "mfa", "mfa-y"]),
            names(&["my-mfa-x", "mfa"])
        );
    }

    #[test]
    fn test_choose_all() {
        let list = names(&["a", "b"]);
        assert_eq!(choose(&list, "all"), Some(names(&["a", "b"])));
        assert_eq!(choose(&list, "  ALL \n"), Some(names(&["a", "b"])));
    }

    #[test]
    fn test_choose_indices() {
        let list = names(&["a", "b"]);
        assert_eq!(choose(&list, "0 1"), Some(names(&["a", "b"])));
        assert_eq!(choose(&list, "1"), Some(names(&["b"])));
        assert_eq!(choose(&list, "1\t  0"), Some(names(&["b", "a"])));
    }

    #[test]
    fn test_choose_drops_out_of_range_and_duplicates() {
        let list = names(&["a", "b"]);
        assert_eq!(choose(&list, "5"), None);
        assert_eq!(choose(&list, "0 5 0"), Some(names(&["a"])));
    }

    #[test]
    fn test_choose_rejects_garbage() {
        let list = names(&["a", "b"]);
        assert_eq!(choose(&list, ""), None);
        assert_eq!(choose(&list, "   "), None);
        assert_eq!(choose(&list, "first"), None);
        assert_eq!(choose(&list, "-1"), None);
    }

    #[test]
    fn test_select_retries_until_valid() {
        let list = names(&["a", "b"]);
        let mut prompt = ScriptedPrompt::new(&["", "7", "x", "1"]);

        let chosen = select(&list, &mut prompt).unwrap();

        assert_eq!(chosen, names(&["b"]));
        assert_eq!(prompt.questions.len(), 4);
        assert_eq!(prompt.told("ERROR. Please select correct option"), 3);
        assert!(prompt.questions[0].contains("[0 to 1]"));
    }

    #[test]
    fn test_select_lists_profiles_with_indices() {
        let list = names(&["default", "work"]);
        let mut prompt = ScriptedPrompt::new(&["all"]);

        select(&list, &mut prompt).unwrap();

        assert_eq!(prompt.told("0) default"), 1);
        assert_eq!(prompt.told("1) work"), 1);
    }

    #[test]
    fn test_select_fails_when_input_closes() {
        let mut prompt = ScriptedPrompt::new(&["9"]);
        let result = select(&names(&["a"]), &mut prompt);
        assert!(matches!(result, Err(RotateError::InputClosed(_))));
    }

    #[test]
    fn test_select_without_profiles() {
        let mut prompt = ScriptedPrompt::new(&["all"]);
        let result = select(&[], &mut prompt);
        assert!(matches!(result, Err(RotateError::NoProfiles)));
        assert_eq!(prompt.remaining(), 1);
    }
}
