//! Consumes the fragments generated by `build.rs`, the way the extension's
//! glue file `#include`s them.

pub const SOURCES: &str = include_str!(concat!(env!("OUT_DIR"), "/.sources.def"));
pub const CONSTANTS: &str = include_str!(concat!(env!("OUT_DIR"), "/.const.def"));
pub const METHODS: &str = include_str!(concat!(env!("OUT_DIR"), "/.methods.def"));
pub const TYPES: &str = include_str!(concat!(env!("OUT_DIR"), "/.types.def"));

include!(concat!(env!("OUT_DIR"), "/libraries.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_are_generated() {
        for text in [SOURCES, CONSTANTS, METHODS, TYPES] {
            assert!(text.starts_with("/* Generated on "), "missing header:\n{text}");
        }
        assert!(SOURCES.contains("#include \"kqueue.c\"\n"));
        assert!(!SOURCES.contains("freebsdmodule.c"));
        assert!(CONSTANTS.contains("SETDICT_INT(d, \"EVFILT_READ\", EVFILT_READ);"));
        assert!(METHODS.contains("{\"kqueue\", (PyCFunction)PyFB_kqueue, METH_NOARGS,\n PyFB_kqueue__doc__},"));
        assert!(TYPES.contains("INITTYPE(KQueueType, kqueueobject)"));
    }

    #[test]
    fn fragments_are_balanced() {
        for text in [CONSTANTS, METHODS, TYPES] {
            let opens = text.lines().filter(|l| l.starts_with("#if")).count();
            let closes = text.lines().filter(|l| *l == "#endif").count();
            assert_eq!(opens, closes, "unbalanced guards in:\n{text}");
        }
    }

    #[test]
    fn libraries_resolved_for_fixed_release() {
        assert_eq!(LIBRARIES, ["kvm", "util"]);
    }
}
