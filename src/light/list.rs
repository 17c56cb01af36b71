//! Ordered light collections that can never become empty

use glam::Vec2;

use super::source::{LightId, LightSource};
use super::LightError;

/// An ordered list of lights with at least one member.
///
/// Order is meaningful: it is the upload order of the light array and the
/// order in which hit-testing resolves overlapping markers.
#[derive(Debug, Clone, PartialEq)]
pub struct LightList {
    lights: Vec<LightSource>,
}

impl LightList {
    /// Create a list holding its first light.
    pub fn new(first: LightSource) -> Self {
        Self { lights: vec![first] }
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LightSource> {
        self.lights.iter()
    }

    pub fn get(&self, id: LightId) -> Option<&LightSource> {
        self.lights.iter().find(|l| l.id() == id)
    }

    pub fn get_mut(&mut self, id: LightId) -> Option<&mut LightSource> {
        self.lights.iter_mut().find(|l| l.id() == id)
    }

    pub fn contains(&self, id: LightId) -> bool {
        self.get(id).is_some()
    }

    /// The last light of the list.
    pub fn last(&self) -> &LightSource {
        // Non-empty by construction.
        &self.lights[self.lights.len() - 1]
    }

    pub fn push(&mut self, light: LightSource) {
        self.lights.push(light);
    }

    /// Remove a light, refusing to remove the only remaining member.
    pub fn remove(&mut self, id: LightId) -> Result<LightSource, LightError> {
        let index = self.lights.iter().position(|l| l.id() == id).ok_or(LightError::UnknownLight(id))?;
        if self.lights.len() == 1 {
            return Err(LightError::CannotRemoveLast);
        }
        Ok(self.lights.remove(index))
    }

    /// First light, in list order, whose marker box contains `point`.
    ///
    /// `half_extents` is the marker half size in device units.
    pub fn hit_test(&self, point: Vec2, half_extents: Vec2) -> Option<LightId> {
        self.hit_test_excluding(point, half_extents, None)
    }

    /// Like [`LightList::hit_test`], ignoring the light `skip`.
    pub fn hit_test_excluding(&self, point: Vec2, half_extents: Vec2, skip: Option<LightId>) -> Option<LightId> {
        self.lights
            .iter()
            .filter(|l| Some(l.id()) != skip)
            .find(|l| {
                (point.x - l.position.x).abs() < half_extents.x && (point.y - l.position.y).abs() < half_extents.y
            })
            .map(LightSource::id)
    }
}

impl<'a> IntoIterator for &'a LightList {
    type Item = &'a LightSource;
    type IntoIter = std::slice::Iter<'a, LightSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::LightSettings;
    use glam::Vec3;

    fn light(id: u64, x: f32, y: f32) -> LightSource {
        let mut l = LightSource::from_settings(LightId(id), &LightSettings::default());
        l.position = Vec3::new(x, y, 0.3);
        l
    }

    #[test]
    fn test_remove_last_is_refused() {
        let mut list = LightList::new(light(1, 0.0, 0.0));
        assert_eq!(list.remove(LightId(1)), Err(LightError::CannotRemoveLast));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_unknown() {
        let mut list = LightList::new(light(1, 0.0, 0.0));
        list.push(light(2, 0.0, 0.0));
        assert_eq!(list.remove(LightId(9)), Err(LightError::UnknownLight(LightId(9))));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_hit_test_first_in_order() {
        let mut list = LightList::new(light(1, 0.0, 0.0));
        list.push(light(2, 0.05, 0.0));
        list.push(light(3, 0.8, 0.8));
        let half = Vec2::new(0.1, 0.1);
        assert_eq!(list.hit_test(Vec2::new(0.03, 0.0), half), Some(LightId(1)));
        assert_eq!(list.hit_test(Vec2::new(0.82, 0.75), half), Some(LightId(3)));
        assert_eq!(list.hit_test(Vec2::new(-0.5, -0.5), half), None);
    }

    #[test]
    fn test_hit_test_is_strict() {
        let list = LightList::new(light(1, 0.0, 0.0));
        assert_eq!(list.hit_test(Vec2::new(0.1, 0.0), Vec2::new(0.1, 0.1)), None);
    }
}
