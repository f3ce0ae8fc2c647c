use std::ffi::OsStr;

/// What gets rewritten: files ending in `extension`, comments opened by `marker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub extension: &'static str,
    pub marker: &'static str,
}

pub const LUA: Target = Target {
    extension: ".lua",
    marker: "--",
};

impl Target {
    /// Exact, case-sensitive suffix match on the raw file name.
    pub fn matches_name(&self, name: &OsStr) -> bool {
        name.as_encoded_bytes()
            .ends_with(self.extension.as_bytes())
    }
}

#[test]
fn matches_name_is_an_exact_suffix() {
    let cases = [
        ("init.lua", true),
        ("a.b.lua", true),
        (".lua", true),
        ("INIT.LUA", false),
        ("init.Lua", false),
        ("init.lua.bak", false),
        ("init.luac", false),
        ("lua", false),
        ("notes.txt", false),
    ];

    for (name, expected) in cases {
        assert_eq!(LUA.matches_name(OsStr::new(name)), expected, "case: {name}");
    }
}
