use crate::{Profile, SspError};

/// Ordered profiles with an optional current selection.
///
/// The selection is an index, so the list keeps ownership of every
/// profile. An empty list has no current profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileList {
    profiles: Vec<Profile>,
    cur: Option<usize>,
}

impl ProfileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `profile` and returns its index.
    ///
    /// The first profile appended to an empty list becomes current.
    pub fn append(&mut self, profile: Profile) -> usize {
        self.profiles.push(profile);
        let idx = self.profiles.len() - 1;
        if self.cur.is_none() {
            self.cur = Some(idx);
        }
        idx
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Profile> {
        self.profiles.get(idx)
    }

    pub fn cur_index(&self) -> Option<usize> {
        self.cur
    }

    pub fn cur(&self) -> Option<&Profile> {
        self.cur.and_then(|idx| self.profiles.get(idx))
    }

    pub fn cur_mut(&mut self) -> Option<&mut Profile> {
        self.cur.and_then(|idx| self.profiles.get_mut(idx))
    }

    pub fn set_cur(&mut self, idx: usize) -> Result<(), SspError> {
        if idx < self.profiles.len() {
            self.cur = Some(idx);
            Ok(())
        } else {
            Err(SspError::Index(idx))
        }
    }

    /// Moves the selection forward. Returns false if already at the
    /// last profile or the list is empty.
    pub fn select_next(&mut self) -> bool {
        match self.cur {
            Some(idx) if idx + 1 < self.profiles.len() => {
                self.cur = Some(idx + 1);
                true
            }
            _ => false,
        }
    }

    /// Moves the selection backward. Returns false if already at the
    /// first profile or the list is empty.
    pub fn select_prev(&mut self) -> bool {
        match self.cur {
            Some(idx) if idx > 0 => {
                self.cur = Some(idx - 1);
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Profile> {
        self.profiles.iter_mut()
    }

    pub fn as_slice(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Profile] {
        &mut self.profiles
    }
}

impl FromIterator<Profile> for ProfileList {
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        let mut list = Self::new();
        for profile in iter {
            list.append(profile);
        }
        list
    }
}

impl IntoIterator for ProfileList {
    type Item = Profile;
    type IntoIter = std::vec::IntoIter<Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProfileList {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}
