// SPDX-License-Identifier: Apache-2.0

use std::iter::FusedIterator;
use std::{mem, slice};
use super::CircularBuffer;

/// An iterator over references to the elements of a [`CircularBuffer`].
#[derive(Clone, Debug)]
pub struct Iter<'a, T: 'a> {
	a: slice::Iter<'a, T>,
	b: slice::Iter<'a, T>,
}

/// An iterator over mutable references to the elements of a [`CircularBuffer`].
#[derive(Debug)]
pub struct IterMut<'a, T: 'a> {
	a: slice::IterMut<'a, T>,
	b: slice::IterMut<'a, T>,
}

/// An owning iterator over the elements of a [`CircularBuffer`].
#[derive(Debug)]
pub struct IntoIter<T> {
	inner: CircularBuffer<T>,
}

impl<'a, T> Iter<'a, T> {
	pub(super) fn new(a: &'a [T], b: &'a [T]) -> Self {
		Self { a: a.iter(), b: b.iter() }
	}
}

impl<'a, T> IterMut<'a, T> {
	pub(super) fn new(a: &'a mut [T], b: &'a mut [T]) -> Self {
		Self { a: a.iter_mut(), b: b.iter_mut() }
	}
}

impl<T> IntoIter<T> {
	pub(super) fn new(inner: CircularBuffer<T>) -> Self {
		Self { inner }
	}
}

impl<'a, T: 'a> Iterator for Iter<'a, T> {
	type Item = &'a T;

	fn next(&mut self) -> Option<&'a T> {
		let Self { a, b } = self;
		a.next().or_else(|| {
			mem::swap(a, b);
			a.next()
		})
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.len();
		(len, Some(len))
	}

	fn last(mut self) -> Option<&'a T> { self.next_back() }

	fn fold<B, F>(self, mut acc: B, mut f: F) -> B
	where F: FnMut(B, Self::Item) -> B {
		acc = self.a.fold(acc, &mut f);
		self.b.fold(acc, &mut f)
	}
}

impl<'a, T: 'a> DoubleEndedIterator for Iter<'a, T> {
	fn next_back(&mut self) -> Option<&'a T> {
		let Self { a, b } = self;
		b.next_back().or_else(|| a.next_back())
	}

	fn rfold<B, F>(self, mut acc: B, mut f: F) -> B
	where F: FnMut(B, Self::Item) -> B {
		acc = self.b.rfold(acc, &mut f);
		self.a.rfold(acc, &mut f)
	}
}

impl<T> ExactSizeIterator for Iter<'_, T> {
	fn len(&self) -> usize {
		self.a.len() + self.b.len()
	}
}

impl<T> FusedIterator for Iter<'_, T> { }

impl<'a, T: 'a> Iterator for IterMut<'a, T> {
	type Item = &'a mut T;

	fn next(&mut self) -> Option<&'a mut T> {
		let Self { a, b } = self;
		a.next().or_else(|| {
			mem::swap(a, b);
			a.next()
		})
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.len();
		(len, Some(len))
	}

	fn fold<B, F>(self, mut acc: B, mut f: F) -> B
	where F: FnMut(B, Self::Item) -> B {
		acc = self.a.fold(acc, &mut f);
		self.b.fold(acc, &mut f)
	}
}

impl<'a, T: 'a> DoubleEndedIterator for IterMut<'a, T> {
	fn next_back(&mut self) -> Option<&'a mut T> {
		let Self { a, b } = self;
		b.next_back().or_else(|| a.next_back())
	}
}

impl<T> ExactSizeIterator for IterMut<'_, T> {
	fn len(&self) -> usize {
		self.a.len() + self.b.len()
	}
}

impl<T> FusedIterator for IterMut<'_, T> { }

impl<T> Iterator for IntoIter<T> {
	type Item = T;

	fn next(&mut self) -> Option<T> {
		self.inner.pop_front()
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.inner.len();
		(len, Some(len))
	}
}

impl<T> DoubleEndedIterator for IntoIter<T> {
	fn next_back(&mut self) -> Option<T> {
		self.inner.pop_back()
	}
}

impl<T> ExactSizeIterator for IntoIter<T> { }

impl<T> FusedIterator for IntoIter<T> { }
