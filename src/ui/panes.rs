/// Focusable panes, in Tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    /// Pokedex list (multi-select)
    Groups,
    /// Pokemon table of the selected pokedexes
    Members,
}

impl Pane {
    pub fn title(self) -> &'static str {
        match self {
            Pane::Groups => "POKEDEX",
            Pane::Members => "POKEMON",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Pane::Groups => Pane::Members,
            Pane::Members => Pane::Groups,
        }
    }

    pub fn prev(self) -> Self {
        // Two panes: cycling either way lands on the other one
        self.next()
    }
}
