use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Only top-level commas separate arguments; commas inside groups are
/// already hidden inside their `Group` token. Empty arguments (for example
/// after a trailing comma) are skipped.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens back into Rust source.
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    tokens.iter().cloned().collect::<TokenStream>().to_string()
}

/// Parses `key = value` attribute arguments such as `event_interval = 8`.
///
/// Unknown shapes are returned as errors so the caller can report them with
/// `compile_error!`.
pub(crate) fn parse_options(attr: TokenStream) -> Result<Vec<(String, String)>, String> {
    split_args(attr)
        .into_iter()
        .map(|arg| match arg.as_slice() {
            [TokenTree::Ident(key), TokenTree::Punct(eq), value @ ..]
                if eq.as_char() == '=' && !value.is_empty() =>
            {
                Ok((key.to_string(), tokens_to_string(value)))
            }
            _ => Err(format!(
                "expected `key = value`, found `{}`",
                tokens_to_string(&arg)
            )),
        })
        .collect()
}

/// Turns `async fn name() { body }` into `fn name() { <wrapped body> }`.
///
/// `wrap` receives the original body source and returns the new body
/// source. Returns `None` when the item has no body.
pub(crate) fn rewrite_async_fn(
    item: TokenStream,
    wrap: impl FnOnce(&str) -> String,
) -> Option<Vec<TokenTree>> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let body_pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))?;

    let body = match &tokens[body_pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => return None,
    };

    let new_body: TokenStream = wrap(&body).parse().ok()?;
    tokens[body_pos] = TokenTree::Group(Group::new(Delimiter::Brace, new_body));

    if let Some(async_pos) = tokens[..body_pos]
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(async_pos);
    }

    Some(tokens)
}

/// Emits `compile_error!(msg)`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
