//! Line-level marker grammars.
//!
//! Each grammar looks at a single line in isolation.  A line is checked
//! against all four grammars (constant, function, type, library) and every
//! hit is returned, in that order.

use regex::Regex;

use crate::config::MarkerConfig;
use crate::error::Error;
use crate::model::{Annotation, CallConv, ConstFlag, ConstType};

/// Compiled marker grammars for one generator configuration.
#[derive(Debug)]
pub struct Matchers {
    constant: Regex,
    os_release: Regex,
    function: Regex,
    decltype: Regex,
    libdep: Regex,
}

impl Matchers {
    /// Compile the grammars.  Only the function prefix is configurable; it
    /// is matched literally.
    pub fn new(markers: &MarkerConfig) -> Result<Self, Error> {
        Ok(Matchers {
            constant: Regex::new(r"^EXPCONST([A-Z_]*)\s*\(([^)]*)\)\s*$")?,
            os_release: Regex::new(r"^\s*([0-9]+)\s*,(.*)$")?,
            function: Regex::new(&format!(
                r"^{}([A-Za-z0-9_]+)\s*\(([^)]*)\)",
                regex::escape(&markers.function_prefix)
            ))?,
            decltype: Regex::new(
                r"^DECLTYPE\s*\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*,\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)\s*$",
            )?,
            libdep: Regex::new(r"LIB_DEPENDS\s*\(\s*([A-Za-z0-9_]+)\s*\)")?,
        })
    }

    /// Every marker found on `line`, in constant → function → type →
    /// library order.
    pub fn match_line(&self, line: &str) -> Result<Vec<Annotation>, Error> {
        let mut found = Vec::new();
        if let Some(a) = self.match_const(line)? {
            found.push(a);
        }
        if let Some(a) = self.match_func(line)? {
            found.push(a);
        }
        if let Some(a) = self.match_type(line) {
            found.push(a);
        }
        if let Some(a) = self.match_libdep(line) {
            found.push(a);
        }
        Ok(found)
    }

    fn match_const(&self, line: &str) -> Result<Option<Annotation>, Error> {
        let Some(caps) = self.constant.captures(line) else {
            return Ok(None);
        };
        let suffix = &caps[1];
        let body = &caps[2];
        let malformed = || Error::MalformedConstant {
            flag: suffix.to_string(),
            body: body.trim().to_string(),
        };

        let (flag, decl) = match suffix {
            "" => (ConstFlag::Always, body),
            "_IFAVAIL" => (ConstFlag::IfAvail, body),
            "_MIN_OSREL" | "_MAX_OSREL" => {
                let rel = self.os_release.captures(body).ok_or_else(malformed)?;
                let rev: u64 = rel[1].parse().map_err(|_| malformed())?;
                let flag = if suffix == "_MIN_OSREL" {
                    ConstFlag::MinOsRel(rev)
                } else {
                    ConstFlag::MaxOsRel(rev)
                };
                (flag, rel.get(2).map_or("", |m| m.as_str()))
            }
            other => {
                return Err(Error::UnsupportedConstFlag {
                    name: split_declaration(body)
                        .map_or(body.trim(), |(_, name)| name)
                        .to_string(),
                    flag: other.to_string(),
                });
            }
        };

        let (spelling, name) = split_declaration(decl).ok_or_else(malformed)?;
        let name = name.to_string();
        let ty = ConstType::parse(spelling).ok_or_else(|| Error::UnsupportedConstType {
            name: name.clone(),
            ty: spelling.to_string(),
        })?;
        Ok(Some(Annotation::Const { flag, ty, name }))
    }

    fn match_func(&self, line: &str) -> Result<Option<Annotation>, Error> {
        let Some(caps) = self.function.captures(line) else {
            return Ok(None);
        };
        let name = caps[1].to_string();
        let args = caps[2].trim();
        let count = if args.is_empty() {
            0
        } else {
            args.split(',').count()
        };
        let conv = CallConv::from_arg_count(count)
            .ok_or_else(|| Error::UnsupportedArity {
                name: name.clone(),
                count,
            })?;
        Ok(Some(Annotation::Func { name, conv }))
    }

    fn match_type(&self, line: &str) -> Option<Annotation> {
        let caps = self.decltype.captures(line)?;
        Some(Annotation::Type {
            type_name: caps[1].to_string(),
            object_name: caps[2].to_string(),
        })
    }

    fn match_libdep(&self, line: &str) -> Option<Annotation> {
        let caps = self.libdep.captures(line)?;
        Some(Annotation::LibDep {
            name: caps[1].to_string(),
        })
    }
}

/// Split `unsigned int NAME` / `char *NAME` into type spelling and name.
fn split_declaration(decl: &str) -> Option<(&str, &str)> {
    let decl = decl.trim();
    let at = decl.rfind(|c: char| c.is_ascii_whitespace() || c == '*')?;
    let (ty, name) = decl.split_at(at + 1);
    let ty = ty.trim();
    if ty.is_empty() || !is_identifier(name) {
        return None;
    }
    Some((ty, name))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
