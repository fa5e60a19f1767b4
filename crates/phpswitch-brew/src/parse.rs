use phpswitch_backend::PhpVersion;
use std::path::Path;

/// Recognize a formula token from the PHP family: exactly `php` or
/// `php@X.Y`. Anything else (`php-cs-fixer`, `phpunit`, deprecated
/// `php@8.1.2` style names) is not ours.
#[must_use]
pub fn parse_family_formula(token: &str) -> Option<PhpVersion> {
    if token == "php" {
        return Some(PhpVersion::Default);
    }
    let rest = token.strip_prefix("php@")?;
    let (major, minor) = rest.split_once('.')?;
    Some(PhpVersion::new(major.parse().ok()?, minor.parse().ok()?))
}

/// Parse `brew list --formula --versions` output into the installed PHP
/// formula family as `(formula name, identifier)` pairs, in brew's order.
#[must_use]
pub fn parse_installed_formulae(output: &str) -> Vec<(String, PhpVersion)> {
    output
        .lines()
        .filter_map(|line| {
            let name = line.split_whitespace().next()?;
            let version = parse_family_formula(name)?;
            Some((name.to_string(), version))
        })
        .collect()
}

/// Parse `brew search --formula php` output into the family's identifiers,
/// ascending and deduplicated.
#[must_use]
pub fn parse_search_output(output: &str) -> Vec<PhpVersion> {
    let mut versions: Vec<PhpVersion> = output
        .split_whitespace()
        .filter_map(parse_family_formula)
        .collect();
    versions.sort_unstable();
    versions.dedup();
    versions
}

/// Map the symlink target of `<prefix>/bin/php` to its owning formula.
///
/// Targets look like `../Cellar/php@8.1/8.1.27/bin/php`; the component
/// after `Cellar` is the formula name.
#[must_use]
pub fn formula_from_cellar_path(target: &Path) -> Option<PhpVersion> {
    let mut components = target.components();
    while let Some(component) = components.next() {
        if component.as_os_str() == "Cellar" {
            let formula = components.next()?.as_os_str().to_str()?;
            return parse_family_formula(formula);
        }
    }
    None
}

/// Parse `brew services list` output into `(service name, running)` pairs
/// for the PHP family.
#[must_use]
pub fn parse_services_list(output: &str) -> Vec<(String, bool)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            parse_family_formula(name)?;
            let status = fields.next().unwrap_or("none");
            Some((name.to_string(), status == "started"))
        })
        .collect()
}
