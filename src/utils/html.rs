/// Cleans admin-authored question content using the ammonia library.
///
/// Whitelist-based: harmless formatting tags (<b>, <i>, <sub>, <sup>) survive,
/// `<script>`, `<iframe>` and event-handler attributes are stripped.
/// A `<script>` element is removed together with its content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
