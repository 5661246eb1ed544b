//! Case conversion between URL segments and class ids.

/// Converts `user_list`, `user-list` or `userList` to `UserList`.
///
/// Only the first letter of each word is changed; the rest is kept as is.
pub fn studly(value: &str) -> String {
    value
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts `UserList` or `userList` to `user_list`.
pub fn snake(value: &str) -> String {
    if !value.chars().any(char::is_uppercase) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 4);
    for (i, c) in value.chars().filter(|c| !c.is_whitespace()).enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_studly() {
        assert_eq!(studly("index"), "Index");
        assert_eq!(studly("user_list"), "UserList");
        assert_eq!(studly("user-list"), "UserList");
        assert_eq!(studly("userList"), "UserList");
        assert_eq!(studly("INDEX"), "INDEX");
        assert_eq!(studly(""), "");
    }

    #[test]
    fn test_snake() {
        assert_eq!(snake("UserList"), "user_list");
        assert_eq!(snake("userList"), "user_list");
        assert_eq!(snake("index"), "index");
        assert_eq!(snake("already_snake"), "already_snake");
    }

    #[test]
    fn test_studly_snake_inverse_for_simple_words() {
        for name in ["index", "user_list", "order_item_detail"] {
            assert_eq!(snake(&studly(name)), name);
        }
    }
}
